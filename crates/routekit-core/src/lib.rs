//! # routekit core
//!
//! Route tables, middleware resolution, request dispatch and the hyper server
//! behind routekit.
//!
//! This crate is not meant to be used directly. Use `routekit` instead.

mod app;
mod config;
mod context;
mod contract;
mod dispatch;
mod error;
mod extract;
mod handler;
pub mod logging;
pub mod middleware;
mod request;
mod response;
mod router;
mod server;
mod table;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use app::App;
pub use config::{
    ConfigError, Environment, ErrorContext, ErrorHandler, RouterConfig, ServerConfig, DEFAULT_ADDR,
    DEFAULT_BODY_LIMIT,
};
pub use context::{Context, RequestContext};
pub use contract::{Endpoint, Middleware, MiddlewareSet, TypedFactory};
pub use error::{ApiError, BoxError, BuildError, Result};
pub use extract::{parse_query, ExtractedInput};
pub use handler::{into_boxed_handler, into_endpoint_handler, BoxedHandler};
pub use logging::{init_tracing, DEFAULT_FILTER};
pub use middleware::{step, BoxFuture, FnFactory, MiddlewareFactory, Next, Step};
pub use request::Request;
pub use response::{json_response, IntoResponse, Json, Response};
pub use router::Router;
pub use server::Server;
pub use http::StatusCode;
pub use table::{join_paths, RouteDefinition, RouteEntry, RouteMethod, RouteTable, UnknownMethod};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
