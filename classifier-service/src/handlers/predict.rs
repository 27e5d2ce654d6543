use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;

use crate::dtos::{PredictionErrorResponse, PredictionResponse, PREDICTION_FAILED};
use crate::inference::InferenceError;
use crate::services::metrics::{record_prediction, record_prediction_error, record_request_failure};
use crate::startup::AppState;

/// Multipart field the client is expected to send the image in.
pub const FILE_FIELD: &str = "file";

/// Failure of `POST /predict`.
///
/// Keeps the `prediction` field present with [`PREDICTION_FAILED`] while the
/// status code tells callers what went wrong.
#[derive(Debug)]
pub struct PredictError(pub AppError);

impl From<AppError> for PredictError {
    fn from(err: AppError) -> Self {
        PredictError(err)
    }
}

impl From<InferenceError> for PredictError {
    fn from(err: InferenceError) -> Self {
        if err.is_client_error() {
            PredictError(AppError::UnprocessableEntity(anyhow::Error::new(err)))
        } else {
            PredictError(AppError::ModelError(anyhow::Error::new(err)))
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let error = match &self.0 {
            // Model internals are logged, not returned.
            AppError::ModelError(_) | AppError::InternalError(_) => {
                "prediction failed".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(PredictionErrorResponse {
                prediction: PREDICTION_FAILED,
                error,
            }),
        )
            .into_response()
    }
}

struct Upload {
    file_name: String,
    data: Bytes,
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, PredictError> {
    let mut multipart = multipart.map_err(|rejection| {
        record_request_failure("not_multipart");
        tracing::warn!(error = %rejection.body_text(), "Rejected non-multipart request");
        PredictError(AppError::BadRequest(anyhow::anyhow!(rejection.body_text())))
    })?;

    let upload = read_upload(&mut multipart).await.map_err(|e| {
        tracing::warn!(error = %e.0, "Rejected upload");
        e
    })?;

    tracing::info!(
        file_name = %upload.file_name,
        size = upload.data.len(),
        "Received image"
    );

    let predictor = state.predictor.clone();
    let data = upload.data;
    let result = tokio::task::spawn_blocking(move || predictor.predict_bytes(&data))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Inference worker failed");
            record_request_failure("worker");
            PredictError(AppError::InternalError(anyhow::anyhow!(
                "inference worker failed: {}",
                e
            )))
        })?;

    match result {
        Ok(label) => {
            record_prediction(label);
            tracing::info!(file_name = %upload.file_name, %label, "Prediction");
            Ok(Json(PredictionResponse { prediction: label }))
        }
        Err(err) => {
            record_prediction_error(&err);
            if err.is_client_error() {
                tracing::warn!(file_name = %upload.file_name, error = %err, "Could not decode upload");
            } else {
                tracing::error!(file_name = %upload.file_name, error = %err, "Prediction failed");
            }
            Err(err.into())
        }
    }
}

/// Read the `file` field, or the first field when none is named `file`.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, PredictError> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_file_field = field.name() == Some(FILE_FIELD);
        if upload.is_some() && !is_file_field {
            continue;
        }

        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some(Upload { file_name, data });

        if is_file_field {
            break;
        }
    }

    upload.ok_or_else(|| {
        record_request_failure("missing_file");
        PredictError(AppError::BadRequest(anyhow::anyhow!("No file uploaded")))
    })
}

fn multipart_error(err: MultipartError) -> PredictError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        record_request_failure("too_large");
        PredictError(AppError::PayloadTooLarge(err.body_text()))
    } else {
        record_request_failure("multipart");
        PredictError(AppError::BadRequest(anyhow::anyhow!(
            "Failed to read multipart body: {}",
            err.body_text()
        )))
    }
}
