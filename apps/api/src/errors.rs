use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::extractor::{ExtractionError, ExtractionErrorKind};
use crate::llm_client::ModelErrorKind;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ExtractionErrorKind::InvalidInput => AppError::Validation(message),
            ExtractionErrorKind::Fetch
            | ExtractionErrorKind::Model(ModelErrorKind::Network) => AppError::Network(message),
            ExtractionErrorKind::Model(ModelErrorKind::Auth) => AppError::Configuration(message),
            ExtractionErrorKind::Model(ModelErrorKind::RateLimit) => AppError::RateLimited(message),
            ExtractionErrorKind::Model(ModelErrorKind::Unknown) => AppError::Extraction(message),
            // Only server shutdown cancels a request-bound extraction.
            ExtractionErrorKind::Cancelled => {
                AppError::Internal(anyhow::Error::new(err).context("server is shutting down"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    "The extraction service is not configured correctly".to_string(),
                )
            }
            AppError::Network(msg) => {
                tracing::error!("Network error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NETWORK_ERROR",
                    msg.clone(),
                )
            }
            AppError::RateLimited(msg) => {
                tracing::warn!("Rate limited: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RATE_LIMITED",
                    "The AI provider is rate limiting requests, try again later".to_string(),
                )
            }
            AppError::Extraction(msg) => {
                tracing::error!("Extraction error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTRACTION_ERROR",
                    msg.clone(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
