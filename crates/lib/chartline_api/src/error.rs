//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chartline_core::chart::ChartError;
use chartline_core::provider::ProviderError;
use chartline_core::request::RequestError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File processing error: {0}")]
    FileProcessing(String),

    #[error("Invalid chart structure: {0}")]
    InvalidChart(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuth(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::FileProcessing(_) => StatusCode::BAD_REQUEST,
            AppError::ProviderAuth(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidChart(_) | AppError::Provider(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Full detail stays in the server log; clients get the sanitized body.
        match &self {
            AppError::Internal(detail) => error!(%status, %detail, "request failed"),
            _ if status.is_server_error() => error!(%status, error = %self, "request failed"),
            _ => warn!(%status, error = %self, "request rejected"),
        }

        let (message, details) = match self {
            AppError::Validation(m) => (m, None),
            AppError::FileProcessing(m) => ("Error processing file".to_string(), Some(m)),
            AppError::InvalidChart(m) => ("Invalid chart structure".to_string(), Some(m)),
            AppError::ProviderAuth(_) => (
                "Authentication failed with the model provider".to_string(),
                None,
            ),
            AppError::Provider(_) => ("Failed to process chat request".to_string(), None),
            AppError::Internal(_) => ("Internal server error".to_string(), None),
        };
        let body = Json(ErrorResponse {
            error: message,
            details,
        });
        (status, body).into_response()
    }
}

impl From<RequestError> for AppError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::FileProcessing(msg) => AppError::FileProcessing(msg),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<ChartError> for AppError {
    fn from(e: ChartError) -> Self {
        AppError::InvalidChart(e.to_string())
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Auth(msg) => AppError::ProviderAuth(msg),
            ProviderError::Config(msg) => AppError::Internal(msg),
            other => AppError::Provider(other.to_string()),
        }
    }
}
