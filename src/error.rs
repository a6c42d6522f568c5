use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{approval_gate::GateError, approval_resolution::ResolutionError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::InvalidOperationKind(kind) => {
                AppError::Validation(format!("Invalid operation_type: {}", kind))
            }
            GateError::Persistence(e) => AppError::Database(e),
        }
    }
}

impl From<ResolutionError> for AppError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::NotPending | ResolutionError::NotFound => {
                AppError::NotFound(err.to_string())
            }
            ResolutionError::Forbidden => AppError::Forbidden(err.to_string()),
            ResolutionError::Persistence(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Database(ref e) = self {
            tracing::error!(error = %e, "Request failed on database error");
        }

        let (status, error_message) = match self {
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
