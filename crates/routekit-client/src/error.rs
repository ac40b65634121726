//! Client error types

use http::StatusCode;
use routekit_validate::ValidationError;
use serde_json::Value;

/// Result type alias for client calls
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Error returned by every client call, after it went through `on_error`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{message} (status {status})")]
    Http {
        status: StatusCode,
        /// `message` of the error body, or a message made from the status
        message: String,
        /// Parsed error body, or `{"error": <reason phrase>}` if it was not JSON
        body: Value,
    },

    /// Connection, timeout or other transport failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Input could not be serialized
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// Success response that is not JSON, or does not fit the expected type
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Success response rejected by the route's output schema
    #[error("response violates the output schema of {route}: {source}")]
    InvalidResponse {
        route: String,
        #[source]
        source: ValidationError,
    },

    /// A `headers_with` provider could not produce its headers.
    ///
    /// routekit never builds this itself. Providers return it, e.g. when a
    /// token is not a valid header value or cannot be fetched.
    #[error("invalid header: {0}")]
    Header(String),
}

impl ClientError {
    /// Build the error for a non-success response from its raw body.
    pub(crate) fn from_response(status: StatusCode, bytes: &[u8]) -> Self {
        let body = serde_json::from_slice::<Value>(bytes).unwrap_or_else(|_| {
            serde_json::json!({ "error": status.canonical_reason().unwrap_or("Unknown error") })
        });
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        ClientError::Http {
            status,
            message,
            body,
        }
    }

    /// HTTP status, for errors that carry one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Parsed error body of an HTTP error
    pub fn body(&self) -> Option<&Value> {
        match self {
            ClientError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}
