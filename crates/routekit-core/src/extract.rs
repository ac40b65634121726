//! Input extraction: path params, query and body merged into one value.
//!
//! The merge rule, in order:
//!
//! 1. Non-empty path params go under `params`.
//! 2. A non-empty query goes under `query`.
//! 3. For `POST`/`PUT`/`PATCH` with a body: if `params` or `query` were added,
//!    the body goes under `body`; otherwise the body *is* the input.
//! 4. With nothing added the input is `{}`.
//!
//! Clients encode calls as the exact inverse of this rule, so the shape of a
//! route's input schema decides both sides.

use crate::table::RouteMethod;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// The extracted input of one request, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedInput {
    /// No params, query or body
    Empty,
    /// Only a body: its fields are the input
    Body(Value),
    /// Params and/or query, optionally with a body nested under `body`
    Nested {
        params: Option<Map<String, Value>>,
        query: Option<Map<String, Value>>,
        body: Option<Value>,
    },
}

impl ExtractedInput {
    pub fn from_parts(
        method: RouteMethod,
        params: &IndexMap<String, String>,
        query: &Map<String, Value>,
        body: Option<&Value>,
    ) -> Self {
        let params = (!params.is_empty()).then(|| {
            params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<_, _>>()
        });
        let query = (!query.is_empty()).then(|| query.clone());
        let body = body.filter(|_| method.accepts_body()).cloned();

        match (params, query, body) {
            (None, None, None) => ExtractedInput::Empty,
            (None, None, Some(body)) => ExtractedInput::Body(body),
            (params, query, body) => ExtractedInput::Nested { params, query, body },
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ExtractedInput::Empty => Value::Object(Map::new()),
            ExtractedInput::Body(body) => body,
            ExtractedInput::Nested { params, query, body } => {
                let mut input = Map::new();
                if let Some(params) = params {
                    input.insert("params".into(), Value::Object(params));
                }
                if let Some(query) = query {
                    input.insert("query".into(), Value::Object(query));
                }
                if let Some(body) = body {
                    input.insert("body".into(), body);
                }
                Value::Object(input)
            }
        }
    }
}

/// Parse a query string; repeated keys collect into an array.
pub fn parse_query(query: Option<&str>) -> Result<Map<String, Value>, serde_urlencoded::de::Error> {
    let mut map = Map::new();
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(map);
    };

    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    for (key, value) in pairs {
        match map.get_mut(&key) {
            None => {
                map.insert(key, Value::String(value));
            }
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    Ok(map)
}

/// Percent-decode matched path segments.
pub(crate) fn decode_params<'k, 'v>(
    params: impl Iterator<Item = (&'k str, &'v str)>,
) -> IndexMap<String, String> {
    params
        .map(|(key, raw)| {
            let value = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            (key.to_string(), value)
        })
        .collect()
}
