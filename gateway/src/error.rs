//! Unified error handling for the gateway.
//!
//! Handlers return `ApiError` through `?`; the `IntoResponse` impl maps each
//! variant to an HTTP status and a JSON body. Session decode failures never
//! reach this type: they are absorbed at the accessor as "no session".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Unified error type for gateway handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Generic internal error
    #[error("{0}")]
    Internal(#[from] anyhow::Error),

    /// Identity could not be established
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(e.to_string()),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for gateway handlers
pub type ApiResult<T> = Result<T, ApiError>;
