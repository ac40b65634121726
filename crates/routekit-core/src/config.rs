//! Router and server configuration.
//!
//! [`RouterConfig`] is the router-level configuration surface: registered
//! middleware factories, the error hook, the base path and strict middleware
//! resolution. [`ServerConfig`] carries process settings and can be loaded
//! from `ROUTEKIT_*` environment variables (and a `.env` file).
//!
//! ```ignore
//! // .env
//! ROUTEKIT_ENV=production
//! ROUTEKIT_ADDR=0.0.0.0:8080
//! ROUTEKIT_BASE_PATH=/api
//! ROUTEKIT_BODY_LIMIT=2097152
//! ```

use crate::contract::{Middleware, TypedFactory};
use crate::error::{ApiError, BoxError};
use crate::middleware::{FactoryMap, FnFactory, MiddlewareFactory, Step};
use crate::response::Response;
use crate::table::RouteMethod;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Default request body limit: 1 MiB
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Where a failed request was headed, for the error hook.
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    pub method: RouteMethod,
    /// Route pattern from the table
    pub route: &'a str,
    /// Request path as received
    pub path: &'a str,
}

/// Terminal hook for errors raised by middleware and handlers.
pub type ErrorHandler = Arc<dyn Fn(ApiError, &ErrorContext<'_>) -> Response + Send + Sync>;

/// Deployment profile, read from `ROUTEKIT_ENV`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    /// Error messages are returned to callers
    #[default]
    Development,
    /// Messages of 5xx errors are logged but not returned
    Production,
    Custom(String),
}

impl Environment {
    /// Detect the current environment from `ROUTEKIT_ENV`.
    pub fn current() -> Self {
        std::env::var("ROUTEKIT_ENV")
            .map(|name| Self::from_name(&name))
            .unwrap_or_default()
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "production" | "prod" => Self::Production,
            "development" | "dev" | "" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Router-level configuration.
#[derive(Clone, Default)]
pub struct RouterConfig {
    pub(crate) middleware: FactoryMap,
    pub(crate) error_handler: Option<ErrorHandler>,
    pub(crate) base_path: String,
    pub(crate) strict_middleware: bool,
    pub(crate) environment: Environment,
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`. Registering a name twice keeps the last factory.
    pub fn middleware(mut self, name: impl Into<String>, factory: impl MiddlewareFactory) -> Self {
        self.middleware.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register a closure factory under `name`.
    pub fn middleware_fn<F>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Step, BoxError> + Send + Sync + 'static,
    {
        self.middleware(name, FnFactory::new(factory))
    }

    /// Register a typed middleware under its own name.
    pub fn use_middleware<M: Middleware>(self, middleware: M) -> Self {
        self.middleware(M::NAME, TypedFactory::new(middleware))
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ApiError, &ErrorContext<'_>) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Prefix for every route path.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Fail the build when a route declares middleware with no registered factory.
    pub fn strict_middleware(mut self, strict: bool) -> Self {
        self.strict_middleware = strict;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Names of the registered factories, in registration order.
    pub fn middleware_names(&self) -> impl Iterator<Item = &str> {
        self.middleware.keys().map(String::as_str)
    }
}

impl fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterConfig")
            .field("middleware", &self.middleware.keys().collect::<Vec<_>>())
            .field("error_handler", &self.error_handler.is_some())
            .field("base_path", &self.base_path)
            .field("strict_middleware", &self.strict_middleware)
            .field("environment", &self.environment)
            .finish()
    }
}

/// Error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Env(#[from] envy::Error),

    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// Process-level server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub base_path: Option<String>,
    pub body_limit: usize,
    #[serde(rename = "env")]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            base_path: None,
            body_limit: DEFAULT_BODY_LIMIT,
            environment: Environment::Development,
        }
    }
}

impl ServerConfig {
    /// Load `.env` (if present) and read `ROUTEKIT_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        }
        Ok(envy::prefixed("ROUTEKIT_").from_env::<ServerConfig>()?)
    }
}
