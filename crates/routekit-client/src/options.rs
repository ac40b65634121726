//! Client configuration

use crate::error::ClientError;
use futures_util::future::BoxFuture;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Computes headers for each call, e.g. a freshly refreshed token.
pub type HeaderProvider =
    Arc<dyn Fn() -> BoxFuture<'static, Result<HeaderMap, ClientError>> + Send + Sync>;

/// Observes every error before it is returned to the caller.
pub type ErrorHook = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// Options for [`Client`](crate::Client).
///
/// ```rust,ignore
/// let options = ClientOptions::new()
///     .base_url("http://localhost:8080/api")
///     .header("x-client", "cli")
///     .headers_with(|| async move {
///         let mut headers = HeaderMap::new();
///         let value = HeaderValue::from_str(&format!("Bearer {}", token().await))
///             .map_err(|err| ClientError::Header(err.to_string()))?;
///         headers.insert("authorization", value);
///         Ok::<_, ClientError>(headers)
///     })
///     .on_error(|err| tracing::warn!(%err, "API call failed"));
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    pub(crate) base_url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) header_provider: Option<HeaderProvider>,
    pub(crate) on_error: Option<ErrorHook>,
    pub(crate) validate_responses: bool,
    pub(crate) timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headers: HeaderMap::new(),
            header_provider: None,
            on_error: None,
            validate_responses: false,
            timeout: None,
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepended to every route path. A trailing `/` is ignored.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Add one static header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Replace the static headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Headers computed before each call. They override static headers of the same name.
    pub fn headers_with<F, Fut>(mut self, provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HeaderMap, ClientError>> + Send + 'static,
    {
        self.header_provider = Some(Arc::new(move || Box::pin(provider()) as BoxFuture<'static, _>));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Check success responses against the route's output schema.
    pub fn validate_responses(mut self, validate: bool) -> Self {
        self.validate_responses = validate;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("header_provider", &self.header_provider.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("validate_responses", &self.validate_responses)
            .field("timeout", &self.timeout)
            .finish()
    }
}
