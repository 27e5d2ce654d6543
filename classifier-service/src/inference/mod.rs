//! Lesion classification: preprocessing, model backends and the decision rule.
//!
//! A [`Predictor`] owns one [`Scorer`] for the lifetime of the process. Every
//! request goes through the same fixed pipeline: decode, [`preprocess`], score,
//! then [`Label::from_logit`].

mod label;
mod mock;
mod onnx;
mod preprocess;

pub use label::{sigmoid, Label, MALIGNANT_THRESHOLD};
pub use mock::MockScorer;
pub use onnx::OnnxScorer;
pub use preprocess::{
    decode_image, preprocess, IMAGENET_MEAN, IMAGENET_STD, MAX_DECODE_ALLOC, MAX_IMAGE_DIMENSION,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use ndarray::Array4;
use thiserror::Error;

/// Image tensor in NCHW format (batch, channels, height, width).
pub type ImageTensor = Array4<f32>;

/// Side length of the square model input.
pub const IMAGE_SIZE: u32 = 112;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("uploaded file is empty")]
    EmptyUpload,

    #[error("failed to decode image: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    #[error("model file not found at {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to load ONNX model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("unexpected model output: {0}")]
    InvalidOutput(String),
}

impl InferenceError {
    /// True when the caller sent something that is not a usable image.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyUpload | Self::Decode { .. })
    }

    /// Short stable name used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyUpload => "empty_upload",
            Self::Decode { .. } => "decode",
            Self::ModelNotFound { .. } => "model_not_found",
            Self::ModelLoad { .. } => "model_load",
            Self::Inference(_) => "inference",
            Self::InvalidOutput(_) => "invalid_output",
        }
    }
}

/// A model backend that turns a preprocessed tensor into a single raw logit.
pub trait Scorer: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns an error if the backend fails or produces an unusable output.
    fn logit(&self, tensor: &ImageTensor) -> Result<f32, InferenceError>;
}

/// Shared, read-only classifier used by every request.
#[derive(Clone)]
pub struct Predictor {
    scorer: Arc<dyn Scorer>,
}

impl Predictor {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer }
    }

    pub fn backend(&self) -> &'static str {
        self.scorer.name()
    }

    /// Classify an already decoded image.
    pub fn predict(&self, image: &DynamicImage) -> Result<Label, InferenceError> {
        let tensor = preprocess(image);

        let start = Instant::now();
        let logit = self.scorer.logit(&tensor)?;
        metrics::histogram!("inference_duration_seconds").record(start.elapsed().as_secs_f64());

        let label = Label::from_logit(logit)?;
        tracing::debug!(logit, probability = sigmoid(logit), %label, "Scored image");
        Ok(label)
    }

    /// Decode raw upload bytes and classify them.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Label, InferenceError> {
        let image = decode_image(bytes)?;
        self.predict(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct FixedScorer(f32);

    impl Scorer for FixedScorer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn logit(&self, _tensor: &ImageTensor) -> Result<f32, InferenceError> {
            Ok(self.0)
        }
    }

    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn logit(&self, _tensor: &ImageTensor) -> Result<f32, InferenceError> {
            Err(InferenceError::Inference("session poisoned".to_string()))
        }
    }

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, 128])
        }))
    }

    #[test]
    fn predict_follows_scorer_sign() {
        let benign = Predictor::new(Arc::new(FixedScorer(-2.0)));
        let malignant = Predictor::new(Arc::new(FixedScorer(2.0)));

        assert_eq!(benign.predict(&sample_image()).unwrap(), Label::Benign);
        assert_eq!(malignant.predict(&sample_image()).unwrap(), Label::Malignant);
    }

    #[test]
    fn scorer_errors_propagate() {
        let predictor = Predictor::new(Arc::new(FailingScorer));
        let err = predictor.predict(&sample_image()).unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.kind(), "inference");
    }

    #[test]
    fn predict_bytes_reports_decode_failures_as_client_errors() {
        let predictor = Predictor::new(Arc::new(FixedScorer(1.0)));
        let err = predictor.predict_bytes(b"GIF89a-but-not-really").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn empty_upload_is_distinct_from_decode_failure() {
        let predictor = Predictor::new(Arc::new(FixedScorer(1.0)));
        let err = predictor.predict_bytes(&[]).unwrap_err();
        assert!(matches!(err, InferenceError::EmptyUpload));
        assert_eq!(err.kind(), "empty_upload");
        assert!(err.is_client_error());
    }
}
