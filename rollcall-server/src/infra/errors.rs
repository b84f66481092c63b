use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use rollcall_core::AccountError;
use rollcall_model::api::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
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
        let body = Json(ApiResponse::<()>::error(self.message));
        (self.status, body).into_response()
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(_) | AccountError::NoPasswordGiven => {
                Self::bad_request(err.to_string())
            }
            AccountError::EmailExists => Self::conflict(err.to_string()),
            AccountError::NotFound => Self::not_found(err.to_string()),
            AccountError::AuthFailed => Self::forbidden(err.to_string()),
            AccountError::ExternalService(_) => {
                tracing::warn!(error = %err, "image service call failed");
                Self::bad_gateway(err.to_string())
            }
            AccountError::Backend(_) | AccountError::Internal(_) => {
                tracing::error!(error = %err, "account operation failed");
                Self::internal("Internal server error")
            }
        }
    }
}

// Malformed bodies and query strings are invalid arguments like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_model::ValidationError;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                AccountError::Validation(ValidationError::field("name")),
                StatusCode::BAD_REQUEST,
            ),
            (AccountError::NoPasswordGiven, StatusCode::BAD_REQUEST),
            (AccountError::EmailExists, StatusCode::CONFLICT),
            (AccountError::NotFound, StatusCode::NOT_FOUND),
            (AccountError::AuthFailed, StatusCode::FORBIDDEN),
            (
                AccountError::ExternalService("timeout".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AccountError::Backend("connection reset".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AccountError::Internal("poisoned".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn backend_details_stay_private() {
        let err =
            AppError::from(AccountError::Backend("password=hunter2".into()));
        assert!(!err.message.contains("hunter2"));
    }

    #[test]
    fn validation_message_names_fields() {
        let invalid = ValidationError::new(vec!["name", "email"]);
        let err = AppError::from(AccountError::Validation(invalid));
        assert!(err.message.contains("name"));
        assert!(err.message.contains("email"));
    }
}
