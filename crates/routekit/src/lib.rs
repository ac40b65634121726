//! # routekit
//!
//! Declarative, typed HTTP route tables. One table of
//! `path → method → { input, output, middleware }` drives input validation,
//! per-route middleware and dispatch on the server, and request encoding and
//! response checking on the client.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routekit::prelude::*;
//!
//! #[derive(Serialize, Deserialize, Validate)]
//! struct CreateUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//!     #[validate(email)]
//!     email: String,
//! }
//!
//! fn table() -> RouteTable {
//!     RouteTable::new()
//!         .post("/users", RouteDefinition::new(validated::<CreateUser>(), any_value()))
//!         .get(
//!             "/users/:id",
//!             RouteDefinition::new(
//!                 Arc::new(shape::object().field("params", shape::object().field("id", shape::string()))),
//!                 any_value(),
//!             )
//!             .middleware("auth", true),
//!         )
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), BoxError> {
//!     routekit::init_tracing();
//!     let server = ServerConfig::from_env()?;
//!
//!     App::new(table())
//!         .server_config(&server)
//!         .config(RouterConfig::new().use_middleware(Auth))
//!         .handle(RouteMethod::Post, "/users", |input, _| async move { Ok(input) })
//!         .run(&server.addr)
//!         .await
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `client` (default) - [`Client`] over reqwest
//! - `test-utils` - in-process `TestClient`

// Re-export core functionality
pub use routekit_core::*;

pub use routekit_validate as validate;
pub use routekit_validate::{
    any_value, shape, typed, validated, FieldError, NoInput, Schema, SchemaRef, Shape, ValidationError,
};

#[cfg(feature = "client")]
pub use routekit_client as client;
#[cfg(feature = "client")]
pub use routekit_client::{Client, ClientError, ClientOptions};

/// Prelude module - import everything you need with `use routekit::prelude::*`
pub mod prelude {
    pub use routekit_core::{
        step, ApiError, App, BoxError, Context, Endpoint, Environment, IntoResponse, Json, Middleware,
        RequestContext, Result, RouteDefinition, RouteMethod, RouteTable, Router, RouterConfig,
        ServerConfig,
    };

    pub use routekit_validate::prelude::*;

    #[cfg(feature = "client")]
    pub use routekit_client::{Client, ClientError, ClientOptions};

    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value};
    pub use std::sync::Arc;
    pub use tracing::{debug, error, info, trace, warn};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_imports_work() {
        let _: fn() -> Result<()> = || Ok(());
        let table = RouteTable::new().get("/", RouteDefinition::new(any_value(), any_value()));
        assert_eq!(table.len(), 1);
    }
}
