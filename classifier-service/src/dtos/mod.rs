pub mod prediction;

pub use prediction::{
    HealthResponse, PingResponse, PredictionErrorResponse, PredictionResponse, PREDICTION_FAILED,
};
