/// Unified error types for the authn core
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable validation codes surfaced to clients
pub mod codes {
    pub const MISSING: &str = "MISSING";
    pub const FORMAT_INVALID: &str = "FORMAT_INVALID";
    pub const TAKEN: &str = "TAKEN";
    pub const INSECURE: &str = "INSECURE";
}

/// A single field-scoped validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AuthnError {
    /// One or more field-level input errors, in the order they were found
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    /// Addressed account or token does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage-level uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Private endpoint credentials missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Refresh token backend errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Token signing or verification errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Password hashing errors
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthnError {
    /// Domain errors are expected outcomes; everything else is an
    /// infrastructure failure worth alarming on.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(
            self,
            AuthnError::Validation(_)
                | AuthnError::NotFound(_)
                | AuthnError::Conflict(_)
                | AuthnError::Unauthorized
        )
    }
}

/// Validation error response body
#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    pub errors: Vec<FieldError>,
}

impl IntoResponse for AuthnError {
    fn into_response(self) -> Response {
        match self {
            AuthnError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorsResponse { errors })).into_response()
            }
            AuthnError::Conflict(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorsResponse {
                    errors: vec![FieldError::new("username", codes::TAKEN)],
                }),
            )
                .into_response(),
            AuthnError::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
            AuthnError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            other => {
                // Don't leak details
                tracing::error!(error = %other, "request failed with infrastructure error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Result type alias for authn operations
pub type AuthnResult<T> = Result<T, AuthnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_not_infrastructure() {
        assert!(!AuthnError::Validation(vec![]).is_infrastructure());
        assert!(!AuthnError::NotFound("account".to_string()).is_infrastructure());
        assert!(!AuthnError::Unauthorized.is_infrastructure());
        assert!(AuthnError::Internal("boom".to_string()).is_infrastructure());
        assert!(AuthnError::PasswordHash("bad cost".to_string()).is_infrastructure());
    }

    #[test]
    fn test_status_codes() {
        let validation = AuthnError::Validation(vec![FieldError::new("username", codes::MISSING)]);
        assert_eq!(validation.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let conflict = AuthnError::Conflict("username".to_string());
        assert_eq!(conflict.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing = AuthnError::NotFound("account".to_string());
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let internal = AuthnError::Internal("boom".to_string());
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_errors_response_serialization() {
        let body = ErrorsResponse {
            errors: vec![
                FieldError::new("username", codes::MISSING),
                FieldError::new("password", codes::INSECURE),
            ],
        };

        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"errors":[{"field":"username","message":"MISSING"},{"field":"password","message":"INSECURE"}]}"#
        );
    }
}
