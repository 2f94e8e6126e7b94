use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    response::ErrorResponse,
    users::{password::PasswordError, validation::ValidationErrors},
};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Password(#[from] PasswordError),

    /// The request could not be extracted (body, path or query).
    #[error("bad request: {message}")]
    BadRequest { status: StatusCode, message: String },

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error("email {0} is already registered")]
    EmailTaken(String),

    /// A stored row that no longer satisfies the entity invariants.
    #[error("corrupt user record {id}: {reason}")]
    CorruptRecord { id: Uuid, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            UserError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_fields("VALIDATION_ERROR", "validation failed", fields),
            ),
            UserError::BadRequest { status, message } => {
                debug!(%status, %message, "request rejected");
                (status, ErrorResponse::new("BAD_REQUEST", message))
            }
            UserError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", "user not found"),
            ),
            UserError::EmailTaken(_) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("CONFLICT", "email already registered"),
            ),
            other => {
                error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "an internal server error occurred"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let mut fields = ValidationErrors::new();
        fields.add("name", "name is required");
        assert_eq!(
            UserError::Validation(fields).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::BadRequest {
                status: StatusCode::BAD_REQUEST,
                message: "invalid JSON syntax".into(),
            }
            .into_response()
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::NotFound(Uuid::nil()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            UserError::EmailTaken("a@b.com".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            UserError::Password(PasswordError::Empty).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            UserError::Internal("join".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            UserError::from(PasswordError::Empty).to_string(),
            "password cannot be empty"
        );
        assert_eq!(
            UserError::EmailTaken("a@b.com".into()).to_string(),
            "email a@b.com is already registered"
        );
    }
}
