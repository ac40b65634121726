//! Route handlers, dynamic and typed.

use crate::context::{Context, RequestContext};
use crate::contract::Endpoint;
use crate::error::ApiError;
use crate::middleware::BoxFuture;
use routekit_validate::ValidationError;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Type-erased handler: decoded input and context in, output value out.
pub type BoxedHandler =
    Arc<dyn Fn(Value, RequestContext) -> BoxFuture<'static, Result<Value, ApiError>> + Send + Sync>;

/// Box a handler working on raw JSON values.
pub fn into_boxed_handler<F, Fut>(handler: F) -> BoxedHandler
where
    F: Fn(Value, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    Arc::new(move |input: Value, ctx: RequestContext| {
        Box::pin(handler(input, ctx)) as BoxFuture<'static, _>
    })
}

/// Box a handler for endpoint `E`.
///
/// The decoded input is deserialized into `E::Input` and the context is typed
/// by `E::Middleware`. A decoded value that does not fit `E::Input` is
/// reported like any other input violation.
pub fn into_endpoint_handler<E, F, Fut>(handler: F) -> BoxedHandler
where
    E: Endpoint,
    F: Fn(E::Input, Context<E::Middleware>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<E::Output, ApiError>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |input: Value, ctx: RequestContext| {
        let handler = handler.clone();
        Box::pin(async move {
            let input: E::Input = serde_json::from_value(input)
                .map_err(|err| ApiError::validation(ValidationError::single("", "type", err.to_string())))?;
            let output = handler(input, Context::from_request(ctx)).await?;
            Ok(serde_json::to_value(output)?)
        }) as BoxFuture<'static, Result<Value, ApiError>>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use crate::table::RouteMethod;
    use http::{Method, StatusCode};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Greet {
        name: String,
    }

    struct Hello;

    impl Endpoint for Hello {
        const PATH: &'static str = "/hello";
        const METHOD: RouteMethod = RouteMethod::Post;
        type Input = Greet;
        type Output = String;
        type Middleware = ();
    }

    #[tokio::test]
    async fn dynamic_handler_sees_raw_values() {
        let handler = into_boxed_handler(|input: Value, ctx: RequestContext| async move {
            Ok(json!({"echo": input, "path": ctx.path()}))
        });

        let output = handler(json!({"a": 1}), context(Method::POST, "/echo")).await.unwrap();
        assert_eq!(output, json!({"echo": {"a": 1}, "path": "/echo"}));
    }

    #[tokio::test]
    async fn endpoint_handler_is_typed() {
        let handler = into_endpoint_handler::<Hello, _, _>(|input: Greet, _ctx| async move {
            Ok(format!("Hello, {}!", input.name))
        });

        let output = handler(json!({"name": "Ada"}), context(Method::POST, "/hello")).await.unwrap();
        assert_eq!(output, json!("Hello, Ada!"));

        let err = handler(json!({"nom": "Ada"}), context(Method::POST, "/hello")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
