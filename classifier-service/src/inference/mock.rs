//! Weight-free backend for local development and tests.

use super::{ImageTensor, InferenceError, Scorer};

/// Deterministic scorer: the logit is the mean of the normalized tensor.
///
/// Bright images land above zero (malignant) and dark images below (benign),
/// which is enough to exercise both labels without model weights.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockScorer;

impl MockScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for MockScorer {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn logit(&self, tensor: &ImageTensor) -> Result<f32, InferenceError> {
        tensor
            .mean()
            .ok_or_else(|| InferenceError::InvalidOutput("empty input tensor".to_string()))
    }
}
