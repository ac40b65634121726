//! The route table: path → method → input/output schemas and middleware.
//!
//! A table is plain data. It is built once, then shared by the server
//! (which interprets it into a request pipeline) and by clients (which use it
//! to construct calls).
//!
//! # Example
//!
//! ```rust,ignore
//! use routekit_core::{RouteDefinition, RouteTable};
//! use routekit_validate::shape;
//! use std::sync::Arc;
//!
//! let table = RouteTable::new()
//!     .get(
//!         "/api/users/:id",
//!         RouteDefinition::new(
//!             Arc::new(shape::object().field("params", shape::object().field("id", shape::string()))),
//!             Arc::new(shape::any()),
//!         )
//!         .middleware("auth", true),
//!     );
//! ```

use crate::contract::Endpoint;
use indexmap::IndexMap;
use routekit_validate::SchemaRef;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// HTTP methods a route can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub const ALL: [RouteMethod; 5] = [
        RouteMethod::Get,
        RouteMethod::Post,
        RouteMethod::Put,
        RouteMethod::Patch,
        RouteMethod::Delete,
    ];

    /// Lowercase name as used in route tables (`"get"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "get",
            RouteMethod::Post => "post",
            RouteMethod::Put => "put",
            RouteMethod::Patch => "patch",
            RouteMethod::Delete => "delete",
        }
    }

    pub fn to_http(self) -> http::Method {
        match self {
            RouteMethod::Get => http::Method::GET,
            RouteMethod::Post => http::Method::POST,
            RouteMethod::Put => http::Method::PUT,
            RouteMethod::Patch => http::Method::PATCH,
            RouteMethod::Delete => http::Method::DELETE,
        }
    }

    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET => Some(RouteMethod::Get),
            http::Method::POST => Some(RouteMethod::Post),
            http::Method::PUT => Some(RouteMethod::Put),
            http::Method::PATCH => Some(RouteMethod::Patch),
            http::Method::DELETE => Some(RouteMethod::Delete),
            _ => None,
        }
    }

    /// Whether the server reads a request body for this method.
    pub fn accepts_body(&self) -> bool {
        matches!(self, RouteMethod::Post | RouteMethod::Put | RouteMethod::Patch)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_http().as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported route method `{0}`")]
pub struct UnknownMethod(pub String);

impl FromStr for RouteMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// Input/output contract of a single route.
#[derive(Clone)]
pub struct RouteDefinition {
    pub input: SchemaRef,
    pub output: SchemaRef,
    /// Declared middleware in declaration order. `None` is an undefined config:
    /// the entry is skipped when the route is built.
    pub middleware: IndexMap<String, Option<Value>>,
}

impl RouteDefinition {
    pub fn new(input: SchemaRef, output: SchemaRef) -> Self {
        Self {
            input,
            output,
            middleware: IndexMap::new(),
        }
    }

    /// Declare a middleware requirement with its per-route configuration.
    pub fn middleware(mut self, name: impl Into<String>, config: impl Into<Value>) -> Self {
        self.middleware.insert(name.into(), Some(config.into()));
        self
    }

    /// Declare a middleware entry whose configuration may be undefined.
    pub fn middleware_entry(mut self, name: impl Into<String>, config: Option<Value>) -> Self {
        self.middleware.insert(name.into(), config);
        self
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

/// One `(path, method, definition)` triple of a table.
#[derive(Debug, Clone, Copy)]
pub struct RouteEntry<'a> {
    pub path: &'a str,
    pub method: RouteMethod,
    pub definition: &'a RouteDefinition,
}

/// Immutable mapping of path → method → [`RouteDefinition`].
///
/// Defining the same `(path, method)` twice keeps the last definition.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, BTreeMap<RouteMethod, Arc<RouteDefinition>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: impl Into<String>, method: RouteMethod, definition: RouteDefinition) -> Self {
        self.routes
            .entry(path.into())
            .or_default()
            .insert(method, Arc::new(definition));
        self
    }

    pub fn get(self, path: impl Into<String>, definition: RouteDefinition) -> Self {
        self.route(path, RouteMethod::Get, definition)
    }

    pub fn post(self, path: impl Into<String>, definition: RouteDefinition) -> Self {
        self.route(path, RouteMethod::Post, definition)
    }

    pub fn put(self, path: impl Into<String>, definition: RouteDefinition) -> Self {
        self.route(path, RouteMethod::Put, definition)
    }

    pub fn patch(self, path: impl Into<String>, definition: RouteDefinition) -> Self {
        self.route(path, RouteMethod::Patch, definition)
    }

    pub fn delete(self, path: impl Into<String>, definition: RouteDefinition) -> Self {
        self.route(path, RouteMethod::Delete, definition)
    }

    /// Add the route described by an [`Endpoint`].
    pub fn endpoint<E: Endpoint>(self) -> Self {
        self.route(E::PATH, E::METHOD, E::definition())
    }

    /// Merge `other` into this table with every path prefixed by `prefix`.
    pub fn merge(mut self, prefix: &str, other: RouteTable) -> Self {
        for (path, methods) in other.routes {
            let entry = self.routes.entry(join_paths(prefix, &path)).or_default();
            entry.extend(methods);
        }
        self
    }

    pub fn lookup(&self, path: &str, method: RouteMethod) -> Option<&RouteDefinition> {
        self.routes
            .get(path)
            .and_then(|methods| methods.get(&method))
            .map(Arc::as_ref)
    }

    pub(crate) fn lookup_shared(&self, path: &str, method: RouteMethod) -> Option<Arc<RouteDefinition>> {
        self.routes.get(path).and_then(|methods| methods.get(&method)).cloned()
    }

    /// Every route, ordered by path then method.
    pub fn iter(&self) -> impl Iterator<Item = RouteEntry<'_>> {
        self.routes.iter().flat_map(|(path, methods)| {
            methods.iter().map(move |(method, definition)| RouteEntry {
                path,
                method: *method,
                definition,
            })
        })
    }

    /// Methods defined for `path`.
    pub fn methods(&self, path: &str) -> Vec<RouteMethod> {
        self.routes
            .get(path)
            .map(|methods| methods.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|e| format!("{} {}", e.method, e.path)))
            .finish()
    }
}

/// Join a prefix and a route path, normalizing slashes.
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", path),
        (false, true) => normalize_leading(prefix),
        (false, false) => format!("{}/{}", normalize_leading(prefix), path),
    }
}

fn normalize_leading(prefix: &str) -> String {
    if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{}", prefix)
    }
}
