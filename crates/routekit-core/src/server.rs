//! HTTP server implementation

use crate::context::RequestContext;
use crate::error::{ApiError, BoxError};
use crate::extract::{decode_params, parse_query};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::{allow_header, RouteMatch, Router};
use bytes::Bytes;
use http::request::Parts;
use http::{header, HeaderValue, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Serves a compiled [`Router`] over HTTP/1.
pub struct Server {
    router: Arc<Router>,
}

impl Server {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// Bind `addr` and serve until the listener fails.
    pub async fn run(self, addr: &str) -> Result<(), BoxError> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections accepted on `listener`.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
        info!(addr = %listener.local_addr()?, routes = self.router.routes().len(), "routekit server listening");

        loop {
            let (stream, _remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let router = router.clone();
                    async move { Ok::<_, Infallible>(handle_hyper_request(router, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Connection error: {}", err);
                }
            });
        }
    }
}

/// Buffer a hyper request within the body limit, then route it.
async fn handle_hyper_request(router: Arc<Router>, req: hyper::Request<Incoming>) -> Response {
    let start = Instant::now();
    let limit = router.body_limit;
    let (parts, body) = req.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        let response = ApiError::payload_too_large(limit).into_response();
        log_request(&parts.method, parts.uri.path(), response.status(), start);
        return response;
    }

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            let response = if err.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::payload_too_large(limit).into_response()
            } else {
                ApiError::bad_request("Failed to read request body").into_response()
            };
            log_request(&parts.method, parts.uri.path(), response.status(), start);
            return response;
        }
    };

    handle_request(&router, Request::new(parts, body)).await
}

/// Route one buffered request through its pipeline and log the outcome.
pub(crate) async fn handle_request(router: &Router, request: Request) -> Response {
    let start = Instant::now();
    let method = request.parts.method.clone();
    let path = request.parts.uri.path().to_string();

    let response = route_request(router, request.parts, request.body, &path).await;

    log_request(&method, &path, response.status(), start);
    response
}

async fn route_request(router: &Router, parts: Parts, body: Bytes, path: &str) -> Response {
    if body.len() > router.body_limit {
        return ApiError::payload_too_large(router.body_limit).into_response();
    }

    let (pipeline, method, params) = match router.match_route(path, &parts.method) {
        RouteMatch::Found {
            pipeline,
            method,
            params,
        } => (pipeline, method, decode_params(params.into_iter())),
        RouteMatch::NotFound => return ApiError::route_not_found().into_response(),
        RouteMatch::MethodNotAllowed { allowed } => {
            let mut response = ApiError::method_not_allowed().into_response();
            if let Ok(value) = HeaderValue::from_str(&allow_header(&allowed)) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            return response;
        }
    };

    let query = match parse_query(parts.uri.query()) {
        Ok(query) => query,
        Err(_) => return ApiError::bad_request("Invalid query string").into_response(),
    };

    let body = if method.accepts_body() && !body.is_empty() {
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(_) => return ApiError::bad_request("Invalid JSON body").into_response(),
        }
    } else {
        None
    };

    let ctx = RequestContext::new(parts, pipeline.route(), method, params, query, body);
    pipeline.call(ctx).await
}

/// Log request completion
fn log_request(method: &http::Method, path: &str, status: StatusCode, start: Instant) {
    let elapsed = start.elapsed();

    if status.is_success() {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request rejected"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    }
}
