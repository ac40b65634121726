//! Per-route request pipeline: middleware, input validation, handler, output check.
//!
//! Request states:
//!
//! ```text
//! Pending → MiddlewareRunning → InputValidated | InputRejected
//!         → HandlerRunning → OutputValidated | OutputRejected → Responded
//! ```
//!
//! Every request ends with exactly one response. Input rejections, missing
//! handlers and output contract violations are answered inside the pipeline.
//! Errors raised by middleware or handlers (and panics) go to the configured
//! error handler, or to the default JSON error response.

use crate::config::{Environment, ErrorContext, ErrorHandler};
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::extract::ExtractedInput;
use crate::handler::BoxedHandler;
use crate::middleware::{compose, BoxFuture, Next, Step};
use crate::response::{IntoResponse, Json, Response};
use crate::table::{RouteDefinition, RouteMethod};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The validate → handle → check stage that ends every chain.
struct Dispatch {
    method: RouteMethod,
    route: Arc<str>,
    definition: Arc<RouteDefinition>,
    handler: Option<BoxedHandler>,
}

impl Dispatch {
    async fn run(&self, ctx: RequestContext) -> Result<Response, ApiError> {
        let raw = ExtractedInput::from_parts(self.method, &ctx.params, &ctx.query, ctx.body.as_ref())
            .into_value();

        let input = match self.definition.input.decode(raw) {
            Ok(input) => input,
            Err(err) => {
                debug!(
                    method = %self.method,
                    route = %self.route,
                    issues = err.len(),
                    "Request input rejected"
                );
                return Ok(ApiError::validation(err).into_response());
            }
        };

        let Some(handler) = &self.handler else {
            warn!(method = %self.method, route = %self.route, "No handler registered for route");
            return Ok(ApiError::not_implemented().into_response());
        };

        let output = handler(input, ctx).await?;

        if let Err(err) = self.definition.output.check(&output) {
            error!(
                method = %self.method,
                route = %self.route,
                issues = err.len(),
                "Handler output violates the route's output schema"
            );
            for issue in &err.issues {
                error!(
                    method = %self.method,
                    route = %self.route,
                    path = %issue.path,
                    message = %issue.message,
                    "Output schema violation"
                );
            }
            return Ok(ApiError::internal_server_error().into_response());
        }

        Ok(Json(output).into_response())
    }
}

/// The composed chain of one `(method, route)` pair.
pub(crate) struct RoutePipeline {
    method: RouteMethod,
    route: Arc<str>,
    chain: Next,
    error_handler: Option<ErrorHandler>,
    environment: Environment,
}

impl RoutePipeline {
    pub(crate) fn new(
        method: RouteMethod,
        route: Arc<str>,
        definition: Arc<RouteDefinition>,
        steps: Vec<Step>,
        handler: Option<BoxedHandler>,
        error_handler: Option<ErrorHandler>,
        environment: Environment,
    ) -> Self {
        let dispatch = Arc::new(Dispatch {
            method,
            route: route.clone(),
            definition,
            handler,
        });
        let terminal: Next = Arc::new(move |ctx: RequestContext| {
            let dispatch = dispatch.clone();
            Box::pin(async move { dispatch.run(ctx).await }) as BoxFuture<'static, _>
        });

        Self {
            method,
            route,
            chain: compose(steps, terminal),
            error_handler,
            environment,
        }
    }

    pub(crate) fn route(&self) -> Arc<str> {
        self.route.clone()
    }

    pub(crate) async fn call(&self, ctx: RequestContext) -> Response {
        let path = ctx.path().to_string();

        let result = match AssertUnwindSafe((self.chain)(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ApiError::internal_server_error().with_internal(panic_message(&*panic))),
        };

        match result {
            Ok(response) => response,
            Err(err) => {
                let error_ctx = ErrorContext {
                    method: self.method,
                    route: &self.route,
                    path: &path,
                };
                self.handle_error(err, &error_ctx)
            }
        }
    }

    fn handle_error(&self, err: ApiError, ctx: &ErrorContext<'_>) -> Response {
        if let Some(handler) = &self.error_handler {
            return handler(err, ctx);
        }

        if err.status.is_server_error() {
            error!(
                method = %ctx.method,
                route = ctx.route,
                status = err.status.as_u16(),
                error = %err,
                internal = err.internal_details().unwrap_or_default(),
                "Unhandled error in route"
            );
        } else {
            debug!(
                method = %ctx.method,
                route = ctx.route,
                status = err.status.as_u16(),
                error = %err,
                "Request rejected"
            );
        }

        let err = if self.environment.is_production() {
            err.masked()
        } else {
            err
        };
        err.into_response()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use crate::handler::into_boxed_handler;
    use crate::middleware::step;
    use http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use routekit_validate::{any_value, shape, Schema};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn pipeline(
        definition: RouteDefinition,
        steps: Vec<Step>,
        handler: Option<BoxedHandler>,
        error_handler: Option<ErrorHandler>,
        environment: Environment,
    ) -> RoutePipeline {
        RoutePipeline::new(
            RouteMethod::Post,
            Arc::from("/users"),
            Arc::new(definition),
            steps,
            handler,
            error_handler,
            environment,
        )
    }

    fn create_user() -> RouteDefinition {
        RouteDefinition::new(
            Arc::new(
                shape::object()
                    .field("name", shape::string().min_length(1))
                    .field("email", shape::string())
                    .field("role", shape::string().default("member")),
            ),
            Arc::new(shape::object().field("id", shape::integer())),
        )
    }

    fn post(body: Value) -> RequestContext {
        let mut ctx = context(Method::POST, "/users");
        ctx.body = Some(body);
        ctx
    }

    #[tokio::test]
    async fn handler_receives_decoded_input() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = seen.clone();
        let handler = into_boxed_handler(move |input: Value, _ctx| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = Some(input);
                Ok(json!({"id": 1}))
            }
        });

        let p = pipeline(create_user(), vec![], Some(handler), None, Environment::Development);
        let response = p.call(post(json!({"name": "Ada", "email": "a@b.com"}))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"id": 1}));
        assert_eq!(
            seen.lock().unwrap().clone().unwrap(),
            json!({"name": "Ada", "email": "a@b.com", "role": "member"})
        );
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = into_boxed_handler(move |_input: Value, _ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(json!({"id": 1})) }
        });

        let p = pipeline(create_user(), vec![], Some(handler), None, Environment::Development);
        let response = p.call(post(json!({"name": "", "email": "a@b.com"}))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["path"], "name");
        assert_eq!(body["details"].as_array().unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_handler_is_501() {
        let p = pipeline(create_user(), vec![], None, None, Environment::Development);
        let response = p.call(post(json!({"name": "Ada", "email": "a@b.com"}))).await;

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_json(response).await, json!({"error": "Not implemented"}));
    }

    #[tokio::test]
    async fn output_violations_do_not_leak() {
        let handler = into_boxed_handler(|_input: Value, _ctx| async move { Ok(json!({"id": "one"})) });

        let p = pipeline(create_user(), vec![], Some(handler), None, Environment::Development);
        let response = p.call(post(json!({"name": "Ada", "email": "a@b.com"}))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn handler_errors_keep_status_and_message() {
        let handler = into_boxed_handler(|_input: Value, _ctx| async move {
            Err::<Value, _>(ApiError::internal("User not found"))
        });

        let p = pipeline(create_user(), vec![], Some(handler), None, Environment::Development);
        let response = p.call(post(json!({"name": "Ada", "email": "a@b.com"}))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Internal server error", "message": "User not found"})
        );
    }

    #[tokio::test]
    async fn production_hides_server_error_messages() {
        let handler = into_boxed_handler(|_input: Value, _ctx| async move {
            Err::<Value, _>(ApiError::internal("connection refused: db:5432"))
        });

        let p = pipeline(create_user(), vec![], Some(handler), None, Environment::Production);
        let response = p.call(post(json!({"name": "Ada", "email": "a@b.com"}))).await;

        assert_eq!(body_json(response).await, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn error_handler_sees_middleware_errors() {
        let deny = step(|_ctx, _next| async move { Err(ApiError::unauthorized("Missing token")) });
        fn teapot(err: ApiError, ctx: &ErrorContext<'_>) -> Response {
            crate::response::json_response(
                StatusCode::IM_A_TEAPOT,
                &json!({"error": err.error, "route": ctx.route, "path": ctx.path}),
            )
        }
        let hook: ErrorHandler = Arc::new(teapot);

        let p = pipeline(create_user(), vec![deny], None, Some(hook), Environment::Development);
        let response = p.call(post(json!({}))).await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Unauthorized", "route": "/users", "path": "/users"})
        );
    }

    #[tokio::test]
    async fn middleware_runs_before_validation() {
        let deny = step(|_ctx, _next| async move { Err(ApiError::unauthorized("Missing token")) });

        let p = pipeline(create_user(), vec![deny], None, None, Environment::Development);
        let response = p.call(post(json!({"name": ""}))).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Unauthorized", "message": "Missing token"})
        );
    }

    #[tokio::test]
    async fn panics_become_500() {
        let handler = into_boxed_handler(|_input: Value, _ctx| async move {
            if true {
                panic!("boom");
            }
            Ok(json!({"id": 1}))
        });

        let p = pipeline(
            RouteDefinition::new(any_value(), any_value()),
            vec![],
            Some(handler),
            None,
            Environment::Development,
        );
        let response = p.call(post(json!({}))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"error": "Internal server error"}));
    }

    #[test]
    fn any_value_accepts_everything() {
        assert!(any_value().check(&json!([1, "two", null])).is_ok());
    }
}
