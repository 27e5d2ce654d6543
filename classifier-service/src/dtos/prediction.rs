use serde::Serialize;

use crate::inference::Label;

/// Value of the `prediction` field whenever a prediction could not be made.
/// Existing clients match on this string, so it is kept verbatim.
pub const PREDICTION_FAILED: &str = "Erro interno no servidor";

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: Label,
}

#[derive(Debug, Serialize)]
pub struct PredictionErrorResponse {
    pub prediction: &'static str,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model_backend: &'static str,
}
