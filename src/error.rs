//! Error types for the application

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::AuditAction;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authorization denied. Always paired with an audit record.
    #[error("Forbidden: user #{actor_id} may not {} #{target_id}", .action.as_str())]
    Forbidden {
        actor_id: i64,
        action: AuditAction,
        target_id: i64,
    },

    #[error("Leave request #{request_id} was already processed")]
    AlreadyProcessed { request_id: i64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("No actor identity supplied")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, e.clone()),
            AppError::Forbidden { .. } => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::AlreadyProcessed { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidArgument(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.clone()),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Corrupt(e) => {
                tracing::error!("Corrupt record: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Corrupt record".to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Notification(e) => {
                tracing::error!("Notification error: {}", e);
                (StatusCode::BAD_GATEWAY, format!("Notification error: {}", e))
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
