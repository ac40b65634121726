//! routekit application builder

use crate::config::{RouterConfig, ServerConfig, DEFAULT_BODY_LIMIT};
use crate::context::{Context, RequestContext};
use crate::contract::Endpoint;
use crate::dispatch::RoutePipeline;
use crate::error::{ApiError, BoxError, BuildError};
use crate::handler::{into_boxed_handler, into_endpoint_handler, BoxedHandler};
use crate::middleware::resolve_steps;
use crate::router::{MethodPipelines, Router};
use crate::server::Server;
use crate::table::{join_paths, RouteMethod, RouteTable};
use indexmap::IndexMap;
use matchit::Router as MatchitRouter;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Binds a [`RouteTable`] to handler implementations.
///
/// Every route in the table is served. Routes without a handler answer 501;
/// handlers for routes the table does not define fail [`App::build`].
///
/// # Example
///
/// ```rust,ignore
/// use routekit::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), BoxError> {
///     routekit::init_tracing();
///
///     App::new(api::table())
///         .config(RouterConfig::new().use_middleware(Auth).base_path("/api"))
///         .endpoint::<api::GetUser, _, _>(get_user)
///         .handle(RouteMethod::Post, "/users", create_user)
///         .run("127.0.0.1:3000")
///         .await
/// }
/// ```
pub struct App {
    table: RouteTable,
    config: RouterConfig,
    handlers: IndexMap<(RouteMethod, String), BoxedHandler>,
    body_limit: usize,
}

impl App {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            config: RouterConfig::default(),
            handlers: IndexMap::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply process settings: body limit, environment and (if set) base path.
    pub fn server_config(mut self, server: &ServerConfig) -> Self {
        self.body_limit = server.body_limit;
        self.config.environment = server.environment.clone();
        if let Some(base_path) = &server.base_path {
            self.config.base_path = base_path.clone();
        }
        self
    }

    /// Maximum accepted request body, in bytes.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Register a handler working on raw JSON values.
    pub fn handle<F, Fut>(mut self, method: RouteMethod, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        self.handlers
            .insert((method, path.into()), into_boxed_handler(handler));
        self
    }

    /// Register the handler of endpoint `E`.
    pub fn endpoint<E, F, Fut>(mut self, handler: F) -> Self
    where
        E: Endpoint,
        F: Fn(E::Input, Context<E::Middleware>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<E::Output, ApiError>> + Send + 'static,
    {
        self.handlers.insert(
            (E::METHOD, E::PATH.to_string()),
            into_endpoint_handler::<E, F, Fut>(handler),
        );
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve middleware, attach handlers and compile the router.
    pub fn build(mut self) -> Result<Router, BuildError> {
        if let Some((method, path)) = self
            .handlers
            .keys()
            .find(|(method, path)| self.table.lookup(path, *method).is_none())
        {
            return Err(BuildError::UnknownRoute {
                method: *method,
                path: path.clone(),
            });
        }

        let mut by_path: IndexMap<String, MethodPipelines> = IndexMap::new();
        let mut routes = Vec::with_capacity(self.table.len());

        for entry in self.table.iter() {
            let full_path = join_paths(&self.config.base_path, entry.path);
            let steps = resolve_steps(
                entry.method,
                entry.path,
                entry.definition,
                &self.config.middleware,
                self.config.strict_middleware,
            )?;
            let handler = self.handlers.swap_remove(&(entry.method, entry.path.to_string()));
            let definition = self
                .table
                .lookup_shared(entry.path, entry.method)
                .unwrap_or_else(|| Arc::new(entry.definition.clone()));

            debug!(
                method = %entry.method,
                path = %full_path,
                middleware = steps.len(),
                handler = handler.is_some(),
                "Registering route"
            );

            let pipeline = RoutePipeline::new(
                entry.method,
                Arc::from(entry.path),
                definition,
                steps,
                handler,
                self.config.error_handler.clone(),
                self.config.environment.clone(),
            );
            by_path
                .entry(full_path.clone())
                .or_default()
                .insert(entry.method, Arc::new(pipeline));
            routes.push((entry.method, full_path));
        }

        let mut inner = MatchitRouter::new();
        for (path, pipelines) in by_path {
            inner
                .insert(path.clone(), pipelines)
                .map_err(|source| BuildError::Conflict { path, source })?;
        }

        info!(routes = routes.len(), "Route table compiled");
        Ok(Router::new(inner, routes, self.body_limit))
    }

    /// Build and serve on `addr`.
    pub async fn run(self, addr: &str) -> Result<(), BoxError> {
        Server::new(self.build()?).run(addr).await
    }

    /// Build and serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
        Server::new(self.build()?).serve(listener).await
    }
}
