//! Per-request context handed to middleware steps and handlers.

use crate::contract::{Middleware, MiddlewareSet};
use crate::table::RouteMethod;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Request data plus whatever middleware contributed so far.
///
/// Created fresh for every request and dropped once the response is produced.
pub struct RequestContext {
    parts: Parts,
    route: Arc<str>,
    route_method: RouteMethod,
    pub(crate) params: IndexMap<String, String>,
    pub(crate) query: Map<String, Value>,
    pub(crate) body: Option<Value>,
}

impl RequestContext {
    pub(crate) fn new(
        parts: Parts,
        route: Arc<str>,
        route_method: RouteMethod,
        params: IndexMap<String, String>,
        query: Map<String, Value>,
        body: Option<Value>,
    ) -> Self {
        Self {
            parts,
            route,
            route_method,
            params,
            query,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Request path as received, without the query string
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Path pattern of the matched route, as declared in the table
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn route_method(&self) -> RouteMethod {
        self.route_method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Percent-decoded path parameters
    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Parsed query string
    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    /// Parsed JSON body, for methods that carry one
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Store a value for later steps and the handler.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.parts.extensions.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.parts.extensions.get::<T>()
    }

    /// What middleware `M` contributed, if it ran for this request.
    pub fn provided<M: Middleware>(&self) -> Option<M::Provides> {
        self.parts
            .extensions
            .get::<Provision<M>>()
            .map(|p| p.0.clone())
    }

    pub(crate) fn provide<M: Middleware>(&mut self, value: M::Provides) {
        self.parts.extensions.insert(Provision::<M>(value));
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("route", &self.route)
            .field("params", &self.params)
            .finish()
    }
}

/// Extension slot keyed by the middleware type, so two middleware providing
/// the same type never overwrite each other.
struct Provision<M: Middleware>(M::Provides);

impl<M: Middleware> Clone for Provision<M> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Context of a typed handler.
///
/// `provided` holds one `Option` per middleware declared by the endpoint, in
/// declaration order. A slot is `None` when the router has no factory for that
/// middleware or the route left its configuration undefined.
///
/// ```rust,ignore
/// async fn me(_: (), ctx: Context<(Auth,)>) -> Result<User> {
///     let (user,) = ctx.provided;
///     user.ok_or_else(|| ApiError::unauthorized("Not signed in"))
/// }
/// ```
pub struct Context<M: MiddlewareSet = ()> {
    pub request: RequestContext,
    pub provided: M::Provided,
}

impl<M: MiddlewareSet> Context<M> {
    pub(crate) fn from_request(request: RequestContext) -> Self {
        let provided = M::collect(&request);
        Self { request, provided }
    }

    pub fn into_parts(self) -> (RequestContext, M::Provided) {
        (self.request, self.provided)
    }
}

impl<M: MiddlewareSet> Deref for Context<M> {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}

impl<M: MiddlewareSet> DerefMut for Context<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.request
    }
}
