use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing or invalid fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("State conflict: {message}")]
    StateConflict {
        code: &'static str,
        message: String,
        details: Value,
    },

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(_)
            | AppError::ValidationError(_)
            | AppError::MissingFields(_)
            | AppError::StateConflict { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::ValidationError(_) | AppError::MissingFields(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StateConflict { code, .. } => *code,
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::AuthError(msg) | AppError::ValidationError(msg) | AppError::NotFound(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::MissingFields(fields) => {
                warn!(code = self.code(), fields = ?fields, "Request rejected");
            }
            AppError::StateConflict { code, message, .. } => {
                warn!(code, message = %message, "Request rejected");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let (public_message, details) = match self {
            AppError::AuthError(msg) | AppError::ValidationError(msg) | AppError::NotFound(msg) => {
                (msg, None)
            }
            AppError::MissingFields(fields) => (
                format!("Missing or invalid fields: {}", fields.join(", ")),
                Some(json!({ "missing_fields": fields })),
            ),
            AppError::StateConflict {
                message, details, ..
            } => (message, Some(details)),
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
            AppError::InternalServerError(_) => ("An internal error occurred".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(
            AppError::AuthError("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::MissingFields(vec!["email".into()]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_state_conflict_uses_its_own_code() {
        let err = AppError::StateConflict {
            code: "ALREADY_USED",
            message: "Ticket already used".into(),
            details: json!({}),
        };
        assert_eq!(err.code(), "ALREADY_USED");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_fields_are_listed_in_message() {
        let err = AppError::MissingFields(vec!["email".into(), "amount".into()]);
        assert_eq!(err.to_string(), "Missing or invalid fields: email, amount");
    }
}
