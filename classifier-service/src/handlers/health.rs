use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::dtos::{HealthResponse, PingResponse};
use crate::services::get_metrics;
use crate::startup::AppState;

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { message: "pong" })
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "classifier-service",
        version: env!("CARGO_PKG_VERSION"),
        model_backend: state.predictor.backend(),
    })
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
