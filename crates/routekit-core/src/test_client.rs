//! In-process test client
//!
//! Sends requests through the full routing, middleware and dispatch pipeline
//! of a compiled [`Router`] without binding a socket.
//!
//! # Example
//!
//! ```rust,ignore
//! use routekit_core::{App, TestClient, TestRequest};
//!
//! #[tokio::test]
//! async fn creates_users() {
//!     let client = TestClient::new(App::new(table()).handle(...).build().unwrap());
//!
//!     client
//!         .request(TestRequest::post("/users").json(&json!({"name": "Ada"})))
//!         .await
//!         .assert_status(StatusCode::OK);
//! }
//! ```

use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::server::handle_request;
use crate::app::App;
use crate::error::BuildError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Test client for integration testing without network binding
#[derive(Clone)]
pub struct TestClient {
    router: Arc<Router>,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// Build `app` and wrap the resulting router.
    pub fn from_app(app: App) -> Result<Self, BuildError> {
        app.build().map(Self::new)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let mut builder = http::Request::builder().method(req.method).uri(req.path.as_str());
        for (key, value) in req.headers.iter() {
            builder = builder.header(key, value);
        }

        let http_req = match builder.body(req.body.unwrap_or_default()) {
            Ok(http_req) => http_req,
            Err(err) => panic!("invalid test request for {}: {}", req.path, err),
        };

        let response = handle_request(&self.router, Request::from(http_req)).await;
        TestResponse::from_response(response).await
    }
}

/// Test request builder
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TestRequest {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Any method, including ones routekit does not route (`HEAD`, `OPTIONS`)
    pub fn method(method: Method, path: &str) -> Self {
        Self::new(method, path)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (
            key.parse::<http::header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, val);
        }
        self
    }

    /// Set a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = Some(Bytes::from(bytes));
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        self
    }

    /// Set a raw body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Test response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();

        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the header is missing or doesn't match.
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self.headers.get(key).and_then(|v| v.to_str().ok()).unwrap_or("");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', got '{}'",
            key, expected, actual
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the body is not JSON or differs from `expected`.
    pub fn assert_json(&self, expected: &serde_json::Value) -> &Self {
        let actual: serde_json::Value = match self.json() {
            Ok(actual) => actual,
            Err(err) => panic!("response body is not JSON ({}): {}", err, self.text()),
        };
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RouteDefinition, RouteMethod, RouteTable};
    use routekit_validate::{any_value, shape};
    use serde_json::{json, Value};

    fn client() -> TestClient {
        let table = RouteTable::new()
            .get(
                "/items/:id",
                RouteDefinition::new(
                    Arc::new(shape::object().field(
                        "params",
                        shape::object().field("id", shape::integer().coerce()),
                    )),
                    any_value(),
                ),
            )
            .post("/items", RouteDefinition::new(any_value(), any_value()));

        TestClient::from_app(
            App::new(table)
                .body_limit(64)
                .handle(RouteMethod::Get, "/items/:id", |input: Value, _ctx| async move {
                    Ok(json!({"id": input["params"]["id"]}))
                })
                .handle(RouteMethod::Post, "/items", |input: Value, _ctx| async move { Ok(input) }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn routes_through_the_pipeline() {
        client().get("/items/42").await.assert_status(StatusCode::OK).assert_json(&json!({"id": 42}));
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        client()
            .get("/nothing")
            .await
            .assert_status(StatusCode::NOT_FOUND)
            .assert_json(&json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn other_methods_are_405_with_allow() {
        let client = client();
        client
            .request(TestRequest::delete("/items/1"))
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED)
            .assert_header("allow", "GET");

        client
            .request(TestRequest::method(Method::HEAD, "/items"))
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED)
            .assert_header("allow", "POST");
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        client()
            .request(TestRequest::post("/items").body("{not json"))
            .await
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_json(&json!({"error": "Invalid JSON body"}));
    }

    #[tokio::test]
    async fn oversized_bodies_are_413() {
        let big = json!({"data": "x".repeat(100)});
        client()
            .post_json("/items", &big)
            .await
            .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}
