use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use menu_core::{DomainError, StorageError};
use menu_security::AuthError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Failure body. `error` and `message` carry the same text so both the
/// read API (`{error}`) and the admin API (`{success, message}`) shapes hold.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Locked(_) => StatusCode::LOCKED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let message = e.user_message();
        match e {
            DomainError::Validation(_) => ApiError::BadRequest(message),
            DomainError::ItemNotFound(_) | DomainError::CategoryNotFound(_) => {
                ApiError::NotFound(message)
            }
            DomainError::Storage(StorageError::NotFound) => ApiError::NotFound(message),
            DomainError::Storage(_) | DomainError::UnableToGenerateUniqueId => {
                ApiError::InternalError(message)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Locked { .. } => ApiError::Locked(e.to_string()),
            AuthError::Hash(_) => ApiError::InternalError("Login is unavailable".to_string()),
            AuthError::InvalidCredentials { remaining_attempts } => ApiError::Unauthorized(format!(
                "Invalid username or password. {} attempt(s) remaining",
                remaining_attempts
            )),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => {
                tracing::warn!("Request rejected ({}): {}", status, msg);
                msg
            }
            ApiError::Unauthorized(msg) | ApiError::Locked(msg) => {
                tracing::warn!("Admin access denied ({}): {}", status, msg);
                msg
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                msg
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message.clone(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use menu_core::ValidationError;

    #[test]
    fn test_domain_error_statuses() {
        let cases = [
            (DomainError::from(ValidationError::InvalidPrice), StatusCode::BAD_REQUEST),
            (DomainError::ItemNotFound("x".to_string()), StatusCode::NOT_FOUND),
            (DomainError::from(StorageError::NotFound), StatusCode::NOT_FOUND),
            (DomainError::from(StorageError::Io("/srv/data/menu.json: denied".to_string())), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let error = ApiError::from(DomainError::from(StorageError::Io("/srv/data/menu.json".to_string())));
        assert!(!error.to_string().contains("/srv"));
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            ApiError::from(AuthError::Locked { remaining_secs: 30 }).status(),
            StatusCode::LOCKED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidCsrfToken).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
