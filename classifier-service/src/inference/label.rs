//! Binary decision rule over the model logit.

use serde::Serialize;

use super::InferenceError;

/// Probability at or above which a lesion is reported as malignant.
pub const MALIGNANT_THRESHOLD: f32 = 0.5;

/// Classifier output class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    #[serde(rename = "Benigno")]
    Benign,
    #[serde(rename = "Maligno")]
    Malignant,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benign => "Benigno",
            Self::Malignant => "Maligno",
        }
    }

    /// Apply the sigmoid threshold to a raw logit.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidOutput`] for a NaN logit.
    pub fn from_logit(logit: f32) -> Result<Self, InferenceError> {
        if logit.is_nan() {
            return Err(InferenceError::InvalidOutput("model produced NaN".to_string()));
        }

        if sigmoid(logit) >= MALIGNANT_THRESHOLD {
            Ok(Self::Malignant)
        } else {
            Ok(Self::Benign)
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
