use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::matching::error::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Status for each pipeline failure. Retryable upstream failures are 502/503.
fn analysis_status(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AnalysisError::DocumentRead(_) | AnalysisError::EmptyContent(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisError::InvalidJobDescription(_) => StatusCode::BAD_REQUEST,
        AnalysisError::IndexBuild(_)
        | AnalysisError::ModelUnavailable(_)
        | AnalysisError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::ModelInvocation(_) | AnalysisError::MalformedOutput(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                false,
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
                false,
            ),
            AppError::Analysis(e) => {
                let status = analysis_status(e);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Analysis error: {e}");
                }
                (status, e.code(), e.to_string(), e.is_retryable())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    false,
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "retryable": retryable
            }
        }));

        (status, body).into_response()
    }
}
