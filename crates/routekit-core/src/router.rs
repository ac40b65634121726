//! Compiled router: route table + handlers + config on a radix tree (matchit).
//!
//! Paths use the `:name` segment syntax of the route table directly, e.g.
//! `/api/users/:id`. Every `(path, method)` defined in the table is served,
//! with or without a handler; a path with no definition for the request's
//! method answers 405 with an `Allow` header.

use crate::dispatch::RoutePipeline;
use crate::table::RouteMethod;
use http::Method;
use indexmap::IndexMap;
use matchit::Router as MatchitRouter;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pipelines of one path, by method
#[derive(Default)]
pub(crate) struct MethodPipelines {
    pipelines: BTreeMap<RouteMethod, Arc<RoutePipeline>>,
}

impl MethodPipelines {
    pub(crate) fn insert(&mut self, method: RouteMethod, pipeline: Arc<RoutePipeline>) {
        self.pipelines.insert(method, pipeline);
    }

    fn get(&self, method: &Method) -> Option<(RouteMethod, &Arc<RoutePipeline>)> {
        let method = RouteMethod::from_http(method)?;
        self.pipelines.get(&method).map(|p| (method, p))
    }

    fn allowed(&self) -> Vec<RouteMethod> {
        self.pipelines.keys().copied().collect()
    }
}

/// Compiled, immutable router. Build one with [`App::build`](crate::App::build).
pub struct Router {
    inner: MatchitRouter<MethodPipelines>,
    routes: Vec<(RouteMethod, String)>,
    pub(crate) body_limit: usize,
}

impl Router {
    pub(crate) fn new(
        inner: MatchitRouter<MethodPipelines>,
        routes: Vec<(RouteMethod, String)>,
        body_limit: usize,
    ) -> Self {
        Self {
            inner,
            routes,
            body_limit,
        }
    }

    /// Registered `(method, full path)` pairs, ordered by path then method.
    pub fn routes(&self) -> &[(RouteMethod, String)] {
        &self.routes
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Match a request and return the pipeline + raw params
    pub(crate) fn match_route<'a>(&'a self, path: &'a str, method: &Method) -> RouteMatch<'a> {
        match self.inner.at(path) {
            Ok(matched) => match matched.value.get(method) {
                Some((method, pipeline)) => RouteMatch::Found {
                    pipeline: pipeline.clone(),
                    method,
                    params: matched.params.iter().collect(),
                },
                None => RouteMatch::MethodNotAllowed {
                    allowed: matched.value.allowed(),
                },
            },
            Err(_) => RouteMatch::NotFound,
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

/// Result of route matching
pub(crate) enum RouteMatch<'a> {
    Found {
        pipeline: Arc<RoutePipeline>,
        method: RouteMethod,
        params: IndexMap<&'a str, &'a str>,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<RouteMethod>,
    },
}

/// `Allow` header value for a 405 response.
pub(crate) fn allow_header(allowed: &[RouteMethod]) -> String {
    allowed
        .iter()
        .map(RouteMethod::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
