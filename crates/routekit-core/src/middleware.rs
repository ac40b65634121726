//! Per-route middleware composition.
//!
//! The router holds a map of middleware name → [`MiddlewareFactory`]. When a
//! route is built, every entry of its declared middleware map that has both a
//! registered factory and a defined configuration is turned into a [`Step`].
//! Steps run in declaration order, before input validation, and each one
//! either calls `next` or answers the request itself.
//!
//! Entries with no registered factory are skipped. With
//! [`RouterConfig::strict_middleware`](crate::RouterConfig::strict_middleware)
//! they fail the build instead, so a router missing its `auth` factory cannot
//! silently serve routes that declare `auth`.

use crate::context::RequestContext;
use crate::error::{ApiError, BoxError, BuildError};
use crate::response::Response;
use crate::table::{RouteDefinition, RouteMethod};
use indexmap::IndexMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// A boxed, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The rest of the chain after a step
pub type Next =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Response, ApiError>> + Send + Sync>;

/// One request-processing step produced by a factory
pub type Step = Arc<
    dyn Fn(RequestContext, Next) -> BoxFuture<'static, Result<Response, ApiError>> + Send + Sync,
>;

/// Turns a per-route configuration value into a [`Step`].
///
/// Called once per declaring route when the router is built.
pub trait MiddlewareFactory: Send + Sync + 'static {
    fn create(&self, config: &Value) -> Result<Step, BoxError>;
}

/// Factory backed by a closure
pub struct FnFactory<F>(F);

impl<F> FnFactory<F>
where
    F: Fn(&Value) -> Result<Step, BoxError> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> MiddlewareFactory for FnFactory<F>
where
    F: Fn(&Value) -> Result<Step, BoxError> + Send + Sync + 'static,
{
    fn create(&self, config: &Value) -> Result<Step, BoxError> {
        (self.0)(config)
    }
}

/// Box an async function as a [`Step`].
///
/// ```rust,ignore
/// let require_key = step(|ctx, next| async move {
///     if ctx.header("x-api-key").is_none() {
///         return Err(ApiError::unauthorized("Missing API key"));
///     }
///     next(ctx).await
/// });
/// ```
pub fn step<F, Fut>(f: F) -> Step
where
    F: Fn(RequestContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
{
    Arc::new(move |ctx: RequestContext, next: Next| {
        Box::pin(f(ctx, next)) as BoxFuture<'static, _>
    })
}

pub(crate) type FactoryMap = IndexMap<String, Arc<dyn MiddlewareFactory>>;

/// Resolve the declared middleware of one route into its ordered steps.
pub(crate) fn resolve_steps(
    method: RouteMethod,
    path: &str,
    definition: &RouteDefinition,
    factories: &FactoryMap,
    strict: bool,
) -> Result<Vec<Step>, BuildError> {
    let mut steps = Vec::with_capacity(definition.middleware.len());

    for (name, config) in &definition.middleware {
        let Some(config) = config else {
            debug!(%method, path, middleware = %name, "Middleware config undefined, skipping");
            continue;
        };

        let Some(factory) = factories.get(name) else {
            if strict {
                return Err(BuildError::MissingMiddleware {
                    method,
                    path: path.to_string(),
                    name: name.clone(),
                });
            }
            debug!(%method, path, middleware = %name, "No middleware factory registered, skipping");
            continue;
        };

        let step = factory
            .create(config)
            .map_err(|source| BuildError::InvalidMiddlewareConfig {
                method,
                path: path.to_string(),
                name: name.clone(),
                source,
            })?;
        steps.push(step);
    }

    Ok(steps)
}

/// Fold `steps` around `terminal`; the first step runs first.
pub(crate) fn compose(steps: Vec<Step>, terminal: Next) -> Next {
    steps.into_iter().rev().fold(terminal, |next, step| {
        let wrapped: Next = Arc::new(move |ctx: RequestContext| {
            let step = step.clone();
            let next = next.clone();
            Box::pin(async move { step(ctx, next).await }) as BoxFuture<'static, _>
        });
        wrapped
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use crate::response::json_response;
    use http::{Method, StatusCode};
    use routekit_validate::any_value;
    use serde_json::json;
    use std::sync::Mutex;

    fn recording(log: Arc<Mutex<Vec<String>>>, label: &'static str) -> Arc<dyn MiddlewareFactory> {
        Arc::new(FnFactory::new(move |config: &Value| {
            let log = log.clone();
            let config = config.clone();
            Ok(step(move |ctx, next| {
                let log = log.clone();
                let config = config.clone();
                async move {
                    log.lock().unwrap().push(format!("{}:{}", label, config));
                    next(ctx).await
                }
            }))
        }))
    }

    fn terminal(log: Arc<Mutex<Vec<String>>>) -> Next {
        Arc::new(move |_ctx: RequestContext| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push("handler".to_string());
                Ok(json_response(StatusCode::OK, &json!({"ok": true})))
            }) as BoxFuture<'static, Result<Response, ApiError>>
        })
    }

    #[tokio::test]
    async fn steps_run_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut factories = FactoryMap::new();
        factories.insert("auth".into(), recording(log.clone(), "auth"));
        factories.insert("audit".into(), recording(log.clone(), "audit"));

        let definition = RouteDefinition::new(any_value(), any_value())
            .middleware("audit", "full")
            .middleware("auth", true);

        let steps = resolve_steps(RouteMethod::Get, "/", &definition, &factories, false).unwrap();
        let chain = compose(steps, terminal(log.clone()));
        let response = chain(context(Method::GET, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["audit:\"full\"".to_string(), "auth:true".to_string(), "handler".to_string()]
        );
    }

    #[test]
    fn unregistered_and_undefined_entries_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut factories = FactoryMap::new();
        factories.insert("auth".into(), recording(log, "auth"));

        let definition = RouteDefinition::new(any_value(), any_value())
            .middleware("cache", 60)
            .middleware_entry("auth", None);

        let steps = resolve_steps(RouteMethod::Get, "/", &definition, &factories, false).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn strict_mode_rejects_missing_factories() {
        let definition = RouteDefinition::new(any_value(), any_value()).middleware("auth", true);

        let err = resolve_steps(RouteMethod::Post, "/users", &definition, &FactoryMap::new(), true)
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::MissingMiddleware { ref name, .. } if name == "auth"));
        assert_eq!(
            err.to_string(),
            "POST /users: no middleware factory registered for `auth`"
        );
    }

    #[tokio::test]
    async fn a_step_can_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let deny = step(|_ctx, _next| async move { Err(ApiError::unauthorized("Missing token")) });

        let chain = compose(vec![deny], terminal(log.clone()));
        let err = chain(context(Method::GET, "/")).await.unwrap_err();

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert!(log.lock().unwrap().is_empty());
    }
}
