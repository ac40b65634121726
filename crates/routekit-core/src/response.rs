//! Response types for routekit
//!
//! Everything routekit answers is JSON. [`IntoResponse`] is implemented for
//! the few types that end up on the wire: [`Json<T>`], [`ApiError`],
//! `ValidationError` and a ready-made [`Response`].

use crate::error::ApiError;
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;
use routekit_validate::ValidationError;
use serde::Serialize;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

const SERIALIZE_FAILURE: &[u8] = br#"{"error":"Internal server error"}"#;

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

/// JSON body with a 200 status
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::OK, &self.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_response(self.status, &self.body())
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        ApiError::validation(self).into_response()
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Serialize `body` with the given status.
///
/// Falls back to a bare 500 body if `body` fails to serialize.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize response body");
            (StatusCode::INTERNAL_SERVER_ERROR, Bytes::from_static(SERIALIZE_FAILURE))
        }
    };

    let mut response = http::Response::new(Full::new(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
