pub mod health;
pub mod predict;

pub use health::{health_check, metrics_endpoint, ping};
pub use predict::{predict, PredictError};
