//! Encoding a call and extracting it again on the server side yields the
//! same validated input, for every input shape the extractor produces.

use indexmap::IndexMap;
use proptest::prelude::*;
use routekit_client::{encode_request, EncodedRequest};
use routekit_core::{parse_query, ExtractedInput, RouteMethod};
use routekit_validate::{shape, Schema, Shape};
use serde_json::{json, Value};

/// What the server sees for `req` sent to a route registered at `pattern`.
fn extract(pattern: &str, req: &EncodedRequest) -> Value {
    let params: IndexMap<String, String> = pattern
        .split('/')
        .zip(req.path.split('/'))
        .filter_map(|(pattern, segment)| {
            let name = pattern.strip_prefix(':')?;
            Some((name.to_string(), urlencoding::decode(segment).unwrap().into_owned()))
        })
        .collect();

    let path_and_query = req.path_and_query();
    let query = parse_query(path_and_query.split_once('?').map(|(_, q)| q)).unwrap();

    // Through the wire format, as the server reads it.
    let body = req
        .body
        .as_ref()
        .map(|body| serde_json::from_slice::<Value>(&serde_json::to_vec(body).unwrap()).unwrap());

    ExtractedInput::from_parts(req.method, &params, &query, body.as_ref()).into_value()
}

fn assert_round_trip(method: RouteMethod, pattern: &str, schema: &Shape, input: Value) -> Result<(), TestCaseError> {
    let req = encode_request(method, pattern, Some(&input));
    let expected = schema.decode(input);
    prop_assert!(expected.is_ok(), "input does not satisfy its own schema: {:?}", expected);
    prop_assert_eq!(schema.decode(extract(pattern, &req)), expected);
    Ok(())
}

fn text() -> impl Strategy<Value = String> {
    "\\PC{0,16}"
}

proptest! {
    #[test]
    fn flat_bodies_round_trip(name in text(), age in 0i64..150) {
        let schema = shape::object()
            .field("name", shape::string())
            .field("age", shape::integer());

        assert_round_trip(RouteMethod::Post, "/users", &schema, json!({"name": name, "age": age}))?;
    }

    #[test]
    fn params_with_body_round_trip(
        id in "\\PC{1,16}",
        name in text(),
        tags in prop::collection::vec(text(), 0..4),
    ) {
        let schema = shape::object()
            .field("params", shape::object().field("id", shape::string()))
            .field(
                "body",
                shape::object()
                    .field("name", shape::string())
                    .field("tags", shape::array(shape::string())),
            );
        let input = json!({"params": {"id": id}, "body": {"name": name, "tags": tags}});

        assert_round_trip(RouteMethod::Put, "/items/:id", &schema, input)?;
    }

    #[test]
    fn params_with_query_round_trip(id in "\\PC{1,16}", q in text(), page in 0i64..10_000) {
        let schema = shape::object()
            .field("params", shape::object().field("id", shape::string()))
            .field(
                "query",
                shape::object()
                    .field("q", shape::string())
                    .field("page", shape::integer().coerce()),
            );
        let input = json!({"params": {"id": id}, "query": {"q": q, "page": page}});

        assert_round_trip(RouteMethod::Get, "/items/:id", &schema, input)?;
    }

    #[test]
    fn query_only_gets_round_trip(
        q in text(),
        page in 0i64..10_000,
        tags in prop::collection::vec(text(), 1..4),
    ) {
        let schema = shape::object().field(
            "query",
            shape::object()
                .field("q", shape::string())
                .field("page", shape::integer().coerce())
                .field("tags", shape::array(shape::string()).coerce()),
        );
        let input = json!({"query": {"q": q, "page": page, "tags": tags}});

        assert_round_trip(RouteMethod::Get, "/search", &schema, input)?;
    }
}
