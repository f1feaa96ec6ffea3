use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{fmt, io};
use thiserror::Error;

/// Failures raised by the services; mapped to HTTP statuses by `AppError`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("pet `{0}` not found")]
    PetNotFound(i64),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub details: Vec<String>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            details: Vec::new(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.message,
            "status": self.status.as_u16()
        });
        if !self.details.is_empty() {
            body["details"] = json!(self.details);
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::PetNotFound(_) | ServiceError::NotFound(_) => {
                AppError::new(StatusCode::NOT_FOUND, err.to_string())
            }
            ServiceError::Forbidden(msg) => AppError::new(StatusCode::FORBIDDEN, msg),
            ServiceError::BadRequest(msg) => AppError::bad_request(msg),
            ServiceError::ValidationFailed(details) => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: "Please correct the errors below.".into(),
                details,
            },
            ServiceError::InvalidCredentials => {
                AppError::new(StatusCode::UNAUTHORIZED, "Invalid username or password.")
            }
            ServiceError::UsernameTaken(_) => AppError::new(StatusCode::CONFLICT, err.to_string()),
            ServiceError::Sqlx(_) | ServiceError::Io(_) => {
                tracing::error!(error = %err, "request failed");
                AppError::internal("An internal error occurred.")
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::new(rejection.status(), rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::PetNotFound(7), StatusCode::NOT_FOUND),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                ServiceError::ValidationFailed(vec!["age: too old".into()]),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::UsernameTaken("sam".into()), StatusCode::CONFLICT),
            (
                ServiceError::Sqlx(sqlx::Error::PoolClosed),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(ServiceError::Io(io::Error::other("disk on fire")));
        assert_eq!(err.message, "An internal error occurred.");
    }

    #[test]
    fn validation_details_are_kept() {
        let err = AppError::from(ServiceError::ValidationFailed(vec!["name: required".into()]));
        assert_eq!(err.details, vec!["name: required".to_string()]);
    }
}
