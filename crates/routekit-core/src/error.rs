//! Error types for routekit

use crate::table::RouteMethod;
use http::StatusCode;
use routekit_validate::{FieldError, ValidationError};
use serde::Serialize;
use std::fmt;

/// Result type alias for routekit handlers
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Boxed error used by middleware factories and the server loop
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error produced while handling a request.
///
/// Serializes to `{ "error": ..., "message"?: ..., "details"?: [...] }`.
/// `internal` is only ever logged.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Short error title (`"Not found"`, `"Internal server error"`)
    pub error: String,
    /// Human-readable message
    pub message: Option<String>,
    /// Per-path schema violations
    pub details: Option<Vec<FieldError>>,
    pub(crate) internal: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: None,
            details: None,
            internal: None,
        }
    }

    /// Attach a message returned to the caller
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Add internal details (logged, never serialized)
    pub fn with_internal(mut self, details: impl Into<String>) -> Self {
        self.internal = Some(details.into());
        self
    }

    /// Internal details, if any
    pub fn internal_details(&self) -> Option<&str> {
        self.internal.as_deref()
    }

    /// 400 with the schema violations of the request input
    pub fn validation(err: ValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: err.message,
            message: None,
            details: Some(err.issues),
            internal: None,
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized").with_message(message)
    }

    /// 403 Forbidden
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden").with_message(message)
    }

    /// 404 Not Found, as a handler would raise it
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found").with_message(message)
    }

    /// 409 Conflict
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "Conflict").with_message(message)
    }

    /// 500 carrying the message the caller will see
    pub fn internal(message: impl Into<String>) -> Self {
        Self::internal_server_error().with_message(message)
    }

    /// Bare `{ "error": "Internal server error" }`
    pub fn internal_server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// 501 for a route present in the table without a handler
    pub fn not_implemented() -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, "Not implemented")
    }

    pub(crate) fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }

    pub(crate) fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub(crate) fn payload_too_large(limit: usize) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
            .with_message(format!("Request body exceeds limit of {} bytes", limit))
    }

    /// Drop the caller-visible message of a 5xx error.
    pub(crate) fn masked(mut self) -> Self {
        if self.status.is_server_error() {
            if let Some(message) = self.message.take() {
                self.internal.get_or_insert(message);
            }
        }
        self
    }

    pub(crate) fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            error: &self.error,
            message: self.message.as_deref(),
            details: self.details.as_deref(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.error, message),
            None => f.write_str(&self.error),
        }
    }
}

impl std::error::Error for ApiError {}

/// JSON representation of an error response
#[derive(Serialize)]
pub(crate) struct ErrorBody<'a> {
    pub error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a [FieldError]>,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal_server_error().with_internal(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal("I/O error").with_internal(err.to_string())
    }
}

/// Error raised while turning a route table into a router.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{method} {path}: no middleware factory registered for `{name}`")]
    MissingMiddleware {
        method: RouteMethod,
        path: String,
        name: String,
    },

    #[error("{method} {path}: invalid configuration for middleware `{name}`: {source}")]
    InvalidMiddlewareConfig {
        method: RouteMethod,
        path: String,
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("handler registered for {method} {path}, which the route table does not define")]
    UnknownRoute { method: RouteMethod, path: String },

    #[error("cannot register route `{path}`: {source}")]
    Conflict {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_json(err: &ApiError) -> serde_json::Value {
        serde_json::to_value(err.body()).unwrap()
    }

    #[test]
    fn generic_errors_have_only_a_title() {
        assert_eq!(
            to_json(&ApiError::internal_server_error()),
            json!({"error": "Internal server error"})
        );
        assert_eq!(to_json(&ApiError::not_implemented()), json!({"error": "Not implemented"}));
        assert_eq!(ApiError::not_implemented().status, StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn thrown_message_is_serialized() {
        let err = ApiError::internal("User not found");
        assert_eq!(
            to_json(&err),
            json!({"error": "Internal server error", "message": "User not found"})
        );
        assert_eq!(err.to_string(), "Internal server error: User not found");
    }

    #[test]
    fn validation_errors_carry_details() {
        let err: ApiError = ValidationError::single("name", "min_length", "Too short").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            to_json(&err),
            json!({"error": "Validation failed", "details": [{"path": "name", "message": "Too short"}]})
        );
    }

    #[test]
    fn masking_only_touches_server_errors() {
        let masked = ApiError::internal("db password is hunter2").masked();
        assert!(masked.message.is_none());
        assert_eq!(masked.internal_details(), Some("db password is hunter2"));

        let kept = ApiError::unauthorized("Missing token").masked();
        assert_eq!(kept.message.as_deref(), Some("Missing token"));
    }

    #[test]
    fn serde_errors_hide_details() {
        let err: ApiError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.is_none());
        assert!(err.internal_details().is_some());
    }
}
