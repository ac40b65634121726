//! Encoding of a call into method, URL path, query string and JSON body.
//!
//! For inputs shaped the way the server extracts them (a flat body,
//! `{params, body}`, `{params, query}`, or `{query}` on `GET`) this is the
//! inverse of the server's input extraction:
//!
//! - `params` fills every `:name` segment of the route path, percent-encoded.
//!   Placeholders without a value are left as they are.
//! - `query` becomes the query string. For `GET` without a `query` key, the
//!   whole input minus `params` is used instead. `null` values are omitted,
//!   arrays repeat their key and objects are sent as JSON text.
//! - For `POST`, `PUT`, `PATCH` and `DELETE`, `body` is the JSON body. Without
//!   a `body` key, an input that has `params` sends no body and any other
//!   input is sent whole.

use routekit_core::RouteMethod;
use serde_json::{Map, Value};

/// A call, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRequest {
    pub method: RouteMethod,
    /// Route path with params substituted
    pub path: String,
    /// Query pairs in input order, not yet percent-encoded
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl EncodedRequest {
    /// Path plus `?query`, percent-encoded.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Encode a call to `path` with `input`.
pub fn encode_request(method: RouteMethod, path: &str, input: Option<&Value>) -> EncodedRequest {
    let fields = input.and_then(Value::as_object);
    let params = fields.and_then(|f| f.get("params")).and_then(Value::as_object);

    let query = match fields {
        Some(fields) => match fields.get("query") {
            Some(query) => query_pairs(query),
            None if method == RouteMethod::Get => {
                let rest: Map<String, Value> = fields
                    .iter()
                    .filter(|(k, _)| k.as_str() != "params")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                query_pairs(&Value::Object(rest))
            }
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let body = match (method, input, fields) {
        (RouteMethod::Get, _, _) => None,
        (_, _, Some(fields)) => match fields.get("body") {
            Some(body) => Some(body.clone()),
            None if fields.contains_key("params") => None,
            None => input.cloned(),
        },
        (_, input, None) => input.cloned(),
    };

    EncodedRequest {
        method,
        path: substitute_params(path, params),
        query,
        body,
    }
}

/// Replace `:name` segments of `path` with the encoded value of `params.name`.
pub fn substitute_params(path: &str, params: Option<&Map<String, Value>>) -> String {
    let Some(params) = params else {
        return path.to_string();
    };

    path.split('/')
        .map(|segment| {
            let value = segment
                .strip_prefix(':')
                .and_then(|name| params.get(name))
                .and_then(scalar_text);
            match value {
                Some(value) => urlencoding::encode(&value).into_owned(),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn query_pairs(query: &Value) -> Vec<(String, String)> {
    let Some(query) = query.as_object() else {
        return Vec::new();
    };

    let mut pairs = Vec::with_capacity(query.len());
    for (key, value) in query {
        match value {
            Value::Array(items) => {
                pairs.extend(
                    items
                        .iter()
                        .filter_map(scalar_text)
                        .map(|item| (key.clone(), item)),
                );
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

/// Text form of a query or path value; `None` for `null`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn params_are_substituted_and_encoded() {
        let input = json!({"params": {"id": "abc def", "n": 7}});
        let req = encode_request(RouteMethod::Get, "/users/:id/items/:n", Some(&input));
        assert_eq!(req.path, "/users/abc%20def/items/7");
        assert!(req.query.is_empty());
        assert_eq!(req.body, None);
    }

    #[test]
    fn unresolved_placeholders_stay() {
        let input = json!({"params": {"other": "x"}});
        let req = encode_request(RouteMethod::Get, "/users/:id", Some(&input));
        assert_eq!(req.path, "/users/:id");
        assert_eq!(encode_request(RouteMethod::Get, "/users/:id", None).path, "/users/:id");
    }

    #[test]
    fn get_uses_whole_input_minus_params_as_query() {
        let input = json!({"params": {"id": "1"}, "page": 2, "tag": ["a", "b"], "skip": null});
        let req = encode_request(RouteMethod::Get, "/users/:id", Some(&input));
        assert_eq!(
            req.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(req.path_and_query(), "/users/1?page=2&tag=a&tag=b");
    }

    #[test]
    fn explicit_query_wins_and_objects_become_json_text() {
        let input = json!({"query": {"filter": {"a": 1}, "q": "x y"}, "ignored": true});
        let req = encode_request(RouteMethod::Get, "/search", Some(&input));
        assert_eq!(req.path_and_query(), "/search?filter=%7B%22a%22%3A1%7D&q=x%20y");
    }

    #[test]
    fn body_rules() {
        let flat = json!({"name": "Ada"});
        assert_eq!(encode_request(RouteMethod::Post, "/users", Some(&flat)).body, Some(flat.clone()));

        let nested = json!({"params": {"id": "1"}, "body": {"name": "Ada"}});
        let req = encode_request(RouteMethod::Put, "/users/:id", Some(&nested));
        assert_eq!(req.body, Some(json!({"name": "Ada"})));
        assert_eq!(req.path, "/users/1");

        let params_only = json!({"params": {"id": "1"}});
        assert_eq!(encode_request(RouteMethod::Delete, "/users/:id", Some(&params_only)).body, None);

        let with_query = json!({"query": {"force": true}, "name": "Ada"});
        let req = encode_request(RouteMethod::Post, "/jobs", Some(&with_query));
        assert_eq!(req.body, Some(with_query.clone()));
        assert_eq!(req.path_and_query(), "/jobs?force=true");

        assert_eq!(encode_request(RouteMethod::Patch, "/x", Some(&json!([1, 2]))).body, Some(json!([1, 2])));
        assert_eq!(encode_request(RouteMethod::Post, "/x", None).body, None);
    }

    #[test]
    fn get_never_has_a_body() {
        let input = json!({"body": {"a": 1}});
        let req = encode_request(RouteMethod::Get, "/x", Some(&input));
        assert_eq!(req.body, None);
        assert_eq!(req.path_and_query(), "/x?body=%7B%22a%22%3A1%7D");
    }

    proptest! {
        #[test]
        fn substituted_segments_decode_to_the_original(id in "\\PC{1,20}") {
            let params = json!({"id": id.clone()});
            let path = substitute_params("/items/:id", params.as_object());
            let segment = path.strip_prefix("/items/").unwrap();

            prop_assert!(!segment.contains('/'));
            prop_assert_eq!(urlencoding::decode(segment).unwrap().into_owned(), id);
        }
    }
}
