//! The route-table client

use crate::encode::{encode_request, EncodedRequest};
use crate::error::{ClientError, Result};
use crate::options::ClientOptions;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use routekit_core::{Endpoint, RouteMethod, RouteTable};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Calls the routes of a [`RouteTable`] over HTTP.
///
/// Cloning is cheap; clones share the connection pool and options.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    table: Arc<RouteTable>,
    options: Arc<ClientOptions>,
}

impl Client {
    pub fn new(table: RouteTable, options: ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            table: Arc::new(table),
            options: Arc::new(options),
        })
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Call `method path` with a JSON input and return the JSON output.
    pub async fn call(&self, method: RouteMethod, path: &str, input: Option<Value>) -> Result<Value> {
        let result = self.execute(method, path, input.as_ref()).await;
        self.report(result)
    }

    pub async fn get(&self, path: &str, input: Option<Value>) -> Result<Value> {
        self.call(RouteMethod::Get, path, input).await
    }

    pub async fn post(&self, path: &str, input: Option<Value>) -> Result<Value> {
        self.call(RouteMethod::Post, path, input).await
    }

    pub async fn put(&self, path: &str, input: Option<Value>) -> Result<Value> {
        self.call(RouteMethod::Put, path, input).await
    }

    pub async fn patch(&self, path: &str, input: Option<Value>) -> Result<Value> {
        self.call(RouteMethod::Patch, path, input).await
    }

    pub async fn delete(&self, path: &str, input: Option<Value>) -> Result<Value> {
        self.call(RouteMethod::Delete, path, input).await
    }

    /// Call endpoint `E` with its typed input.
    pub async fn call_endpoint<E: Endpoint>(&self, input: &E::Input) -> Result<E::Output> {
        let result: Result<E::Output> = async {
            let input = serde_json::to_value(input).map_err(ClientError::Encode)?;
            let output = self.execute(E::METHOD, E::PATH, Some(&input)).await?;
            serde_json::from_value(output).map_err(ClientError::Decode)
        }
        .await;
        self.report(result)
    }

    async fn execute(&self, method: RouteMethod, path: &str, input: Option<&Value>) -> Result<Value> {
        let encoded = encode_request(method, path, input);
        let request = self.build(&encoded).await?;

        debug!(method = %method, path = %encoded.path, "Sending request");
        let response = self.http.execute(request).await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ClientError::from_response(status, &bytes));
        }

        let output = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(ClientError::Decode)?
        };

        if !self.options.validate_responses {
            return Ok(output);
        }
        match self.table.lookup(path, method) {
            Some(definition) => definition
                .output
                .decode(output)
                .map_err(|source| ClientError::InvalidResponse {
                    route: format!("{} {}", method, path),
                    source,
                }),
            None => Ok(output),
        }
    }

    async fn build(&self, encoded: &EncodedRequest) -> Result<reqwest::Request> {
        let url = format!("{}{}", self.options.base_url, encoded.path_and_query());

        let computed = match &self.options.header_provider {
            Some(provider) => Some(provider().await?),
            None => None,
        };
        let headers = request_headers(&self.options.headers, computed.as_ref());

        let mut builder = self
            .http
            .request(encoded.method.to_http(), url)
            .headers(headers);
        if let Some(body) = &encoded.body {
            let bytes = serde_json::to_vec(body).map_err(ClientError::Encode)?;
            builder = builder.body(bytes);
        }

        Ok(builder.build()?)
    }

    /// Pass an error to `on_error` before it reaches the caller.
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(error = %err, "routekit call failed");
            if let Some(hook) = &self.options.on_error {
                hook(err);
            }
        }
        result
    }
}

/// `Content-Type: application/json`, then the static headers, then the
/// computed ones. A later layer replaces every value of a name it sets.
fn request_headers(configured: &HeaderMap, computed: Option<&HeaderMap>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for layer in std::iter::once(configured).chain(computed) {
        for name in layer.keys() {
            headers.remove(name);
        }
        for (name, value) in layer.iter() {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("routes", &self.table.len())
            .field("options", &self.options)
            .finish()
    }
}
