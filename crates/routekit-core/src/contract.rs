//! Compile-time contract between a route table, its handlers and its clients.
//!
//! An [`Endpoint`] ties a path and method to concrete input and output types
//! and to the set of middleware the route declares. Handlers registered for an
//! endpoint receive `E::Input` and a [`Context`](crate::Context) typed by
//! `E::Middleware`; clients calling the endpoint send `E::Input` and get back
//! `E::Output`. A mismatch on either side is a build error.
//!
//! ```rust,ignore
//! struct Auth;
//!
//! impl Middleware for Auth {
//!     const NAME: &'static str = "auth";
//!     type Config = bool;
//!     type Provides = User;
//!
//!     async fn provide(&self, _: &bool, ctx: &RequestContext) -> Result<User, ApiError> {
//!         lookup_token(ctx.header("authorization")).await
//!     }
//! }
//!
//! struct GetMe;
//!
//! impl Endpoint for GetMe {
//!     const PATH: &'static str = "/api/me";
//!     const METHOD: RouteMethod = RouteMethod::Get;
//!     type Input = NoInput;
//!     type Output = User;
//!     type Middleware = (Auth,);
//!
//!     fn middleware() -> (Option<bool>,) {
//!         (Some(true),)
//!     }
//! }
//! ```

use crate::context::RequestContext;
use crate::error::{ApiError, BoxError};
use crate::middleware::{BoxFuture, MiddlewareFactory, Next, Step};
use crate::response::Response;
use crate::table::{RouteDefinition, RouteMethod};
use routekit_validate::{typed, SchemaRef};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// A typed middleware: accepts a per-route `Config` and contributes `Provides`
/// to the context of every request on routes that declare it.
pub trait Middleware: Send + Sync + 'static {
    /// Key used in route definitions and router configuration
    const NAME: &'static str;

    type Config: DeserializeOwned + Serialize + Send + Sync + 'static;

    type Provides: Clone + Send + Sync + 'static;

    /// Compute the contribution for one request. An error short-circuits the
    /// request and goes to the router's error handler.
    fn provide(
        &self,
        config: &Self::Config,
        ctx: &RequestContext,
    ) -> impl Future<Output = Result<Self::Provides, ApiError>> + Send;
}

/// The middleware declared by an endpoint, as `()` or a tuple of [`Middleware`].
pub trait MiddlewareSet: Send + Sync + 'static {
    /// One `Option<M::Provides>` per member
    type Provided: Send + 'static;

    /// One `Option<M::Config>` per member; `None` leaves the entry undefined
    type Configs: Default + Send + Sync + 'static;

    /// Route-table form of `configs`, in declaration order.
    fn describe(configs: &Self::Configs) -> Vec<(&'static str, Option<Value>)>;

    fn collect(ctx: &RequestContext) -> Self::Provided;
}

impl MiddlewareSet for () {
    type Provided = ();
    type Configs = ();

    fn describe(_: &()) -> Vec<(&'static str, Option<Value>)> {
        Vec::new()
    }

    fn collect(_: &RequestContext) -> Self::Provided {}
}

macro_rules! impl_middleware_set {
    ($($M:ident $idx:tt),+) => {
        impl<$($M: Middleware),+> MiddlewareSet for ($($M,)+) {
            type Provided = ($(Option<$M::Provides>,)+);
            type Configs = ($(Option<$M::Config>,)+);

            fn describe(configs: &Self::Configs) -> Vec<(&'static str, Option<Value>)> {
                vec![$(
                    (
                        $M::NAME,
                        configs.$idx.as_ref().and_then(|c| serde_json::to_value(c).ok()),
                    ),
                )+]
            }

            fn collect(ctx: &RequestContext) -> Self::Provided {
                ($(ctx.provided::<$M>(),)+)
            }
        }
    };
}

impl_middleware_set!(M1 0);
impl_middleware_set!(M1 0, M2 1);
impl_middleware_set!(M1 0, M2 1, M3 2);
impl_middleware_set!(M1 0, M2 1, M3 2, M4 3);
impl_middleware_set!(M1 0, M2 1, M3 2, M4 3, M5 4);

/// A route whose types are known at compile time.
pub trait Endpoint: Send + Sync + 'static {
    const PATH: &'static str;
    const METHOD: RouteMethod;

    type Input: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;
    type Middleware: MiddlewareSet;

    /// Per-route middleware configuration. Defaults to all undefined.
    fn middleware() -> <Self::Middleware as MiddlewareSet>::Configs {
        Default::default()
    }

    fn input_schema() -> SchemaRef {
        typed::<Self::Input>()
    }

    fn output_schema() -> SchemaRef {
        typed::<Self::Output>()
    }

    /// Route-table entry for this endpoint.
    fn definition() -> RouteDefinition {
        <Self::Middleware as MiddlewareSet>::describe(&Self::middleware()).into_iter().fold(
            RouteDefinition::new(Self::input_schema(), Self::output_schema()),
            |definition, (name, config)| definition.middleware_entry(name, config),
        )
    }
}

/// Registers a [`Middleware`] as a by-name factory.
pub struct TypedFactory<M>(Arc<M>);

impl<M: Middleware> TypedFactory<M> {
    pub fn new(middleware: M) -> Self {
        Self(Arc::new(middleware))
    }
}

impl<M: Middleware> MiddlewareFactory for TypedFactory<M> {
    fn create(&self, config: &Value) -> Result<Step, BoxError> {
        let config: Arc<M::Config> = Arc::new(serde_json::from_value(config.clone())?);
        let middleware = self.0.clone();

        Ok(Arc::new(move |mut ctx: RequestContext, next: Next| {
            let config = config.clone();
            let middleware = middleware.clone();
            Box::pin(async move {
                let provided = middleware.provide(&config, &ctx).await?;
                ctx.provide::<M>(provided);
                next(ctx).await
            }) as BoxFuture<'static, Result<Response, ApiError>>
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct Auth;

    impl Middleware for Auth {
        const NAME: &'static str = "auth";
        type Config = bool;
        type Provides = String;

        async fn provide(&self, _: &bool, _: &RequestContext) -> Result<String, ApiError> {
            Ok("alice".into())
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Limit {
        per_minute: u32,
    }

    struct RateLimit;

    impl Middleware for RateLimit {
        const NAME: &'static str = "rate_limit";
        type Config = Limit;
        type Provides = u32;

        async fn provide(&self, config: &Limit, _: &RequestContext) -> Result<u32, ApiError> {
            Ok(config.per_minute)
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Profile {
        name: String,
    }

    struct UpdateProfile;

    impl Endpoint for UpdateProfile {
        const PATH: &'static str = "/profile";
        const METHOD: RouteMethod = RouteMethod::Put;
        type Input = Profile;
        type Output = Profile;
        type Middleware = (RateLimit, Auth);

        fn middleware() -> (Option<Limit>, Option<bool>) {
            (Some(Limit { per_minute: 30 }), Some(true))
        }
    }

    struct Health;

    impl Endpoint for Health {
        const PATH: &'static str = "/health";
        const METHOD: RouteMethod = RouteMethod::Get;
        type Input = routekit_validate::NoInput;
        type Output = String;
        type Middleware = (Auth,);
    }

    #[test]
    fn endpoint_definition_lists_middleware_in_order() {
        let definition = UpdateProfile::definition();
        let entries: Vec<(&str, Option<&Value>)> = definition
            .middleware
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
            .collect();

        assert_eq!(
            entries,
            vec![("rate_limit", Some(&json!({"per_minute": 30}))), ("auth", Some(&json!(true)))]
        );
    }

    #[test]
    fn default_configs_are_undefined() {
        let definition = Health::definition();
        assert_eq!(definition.middleware.get("auth"), Some(&None));
    }

    #[test]
    fn typed_schemas_follow_the_endpoint_types() {
        let definition = UpdateProfile::definition();
        assert!(definition.input.check(&json!({"name": "Ada"})).is_ok());
        assert!(definition.input.check(&json!({"nom": "Ada"})).is_err());
    }

    #[test]
    fn typed_factory_rejects_bad_config() {
        let factory = TypedFactory::new(RateLimit);
        assert!(factory.create(&json!({"per_minute": 5})).is_ok());
        assert!(factory.create(&json!("fast")).is_err());
    }
}
