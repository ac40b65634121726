//! Dynamic value schemas with defaults and coercion.
//!
//! A [`Shape`] describes the structure of a JSON value. Decoding a value walks
//! the shape, collects every violation with its dotted path, applies declared
//! defaults, coerces strings into numbers or booleans where asked to, and
//! strips object keys the shape does not declare.
//!
//! ## Example
//!
//! ```rust,ignore
//! use routekit_validate::shape::{self, Shape};
//!
//! let create_user = shape::object()
//!     .field("name", shape::string().min_length(1))
//!     .field("email", shape::string().email())
//!     .field("role", shape::string().default("member"));
//!
//! let get_user = shape::object()
//!     .field("params", shape::object().field("id", shape::integer().coerce()));
//! ```

use crate::error::{join_path, FieldError, ValidationError};
use crate::schema::Schema;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Number, Value};

/// A declarative description of a JSON value.
#[derive(Debug, Clone)]
pub struct Shape {
    kind: Kind,
    optional: bool,
    nullable: bool,
    default: Option<Value>,
}

#[derive(Debug, Clone)]
enum Kind {
    Any,
    String(StringRules),
    Number(NumberRules),
    Boolean { coerce: bool },
    Array(ArrayRules),
    Object(ObjectRules),
    Literal(Value),
    OneOf(Vec<Value>),
}

#[derive(Debug, Clone, Default)]
struct StringRules {
    min_length: Option<usize>,
    max_length: Option<usize>,
    email: bool,
    pattern: Option<Regex>,
    coerce: bool,
}

#[derive(Debug, Clone, Default)]
struct NumberRules {
    integer: bool,
    coerce: bool,
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Clone)]
struct ArrayRules {
    items: Box<Shape>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    coerce: bool,
}

#[derive(Debug, Clone, Default)]
struct ObjectRules {
    fields: IndexMap<String, Shape>,
    passthrough: bool,
}

impl Shape {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            default: None,
        }
    }

    /// Allow the value to be missing. Missing optional fields are omitted from the decoded object.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Allow an explicit `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value used when the field is missing.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Accept string input for numbers and booleans, scalars for strings, and a
    /// single item for arrays.
    pub fn coerce(mut self) -> Self {
        match &mut self.kind {
            Kind::String(rules) => rules.coerce = true,
            Kind::Number(rules) => rules.coerce = true,
            Kind::Boolean { coerce } => *coerce = true,
            Kind::Array(rules) => rules.coerce = true,
            _ => {}
        }
        self
    }

    /// Minimum number of characters (strings) or items (arrays).
    pub fn min_length(mut self, min: usize) -> Self {
        match &mut self.kind {
            Kind::String(rules) => rules.min_length = Some(min),
            Kind::Array(rules) => rules.min_items = Some(min),
            _ => {}
        }
        self
    }

    /// Maximum number of characters (strings) or items (arrays).
    pub fn max_length(mut self, max: usize) -> Self {
        match &mut self.kind {
            Kind::String(rules) => rules.max_length = Some(max),
            Kind::Array(rules) => rules.max_items = Some(max),
            _ => {}
        }
        self
    }

    /// Require a syntactically valid email address.
    pub fn email(mut self) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.email = true;
        }
        self
    }

    /// Require the string to match `pattern`.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.pattern = Some(pattern);
        }
        self
    }

    /// Inclusive lower bound for numbers.
    pub fn min(mut self, min: f64) -> Self {
        if let Kind::Number(rules) = &mut self.kind {
            rules.min = Some(min);
        }
        self
    }

    /// Inclusive upper bound for numbers.
    pub fn max(mut self, max: f64) -> Self {
        if let Kind::Number(rules) = &mut self.kind {
            rules.max = Some(max);
        }
        self
    }

    /// Declare an object field. Later declarations replace earlier ones.
    pub fn field(mut self, name: impl Into<String>, shape: Shape) -> Self {
        if let Kind::Object(rules) = &mut self.kind {
            rules.fields.insert(name.into(), shape);
        }
        self
    }

    /// Keep undeclared object keys instead of stripping them.
    pub fn passthrough(mut self) -> Self {
        if let Kind::Object(rules) = &mut self.kind {
            rules.passthrough = true;
        }
        self
    }

    /// Declared field names of an object shape, in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        match &self.kind {
            Kind::Object(rules) => rules.fields.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn expected(&self) -> &'static str {
        match &self.kind {
            Kind::Any => "any",
            Kind::String(_) => "string",
            Kind::Number(rules) if rules.integer => "integer",
            Kind::Number(_) => "number",
            Kind::Boolean { .. } => "boolean",
            Kind::Array(_) => "array",
            Kind::Object(_) => "object",
            Kind::Literal(_) | Kind::OneOf(_) => "literal",
        }
    }

    /// Decode `value` found at `path`. `None` means the value is absent and,
    /// when returned, that it must be omitted from the parent.
    fn parse(&self, value: Option<&Value>, path: &str, issues: &mut Vec<FieldError>) -> Option<Value> {
        let value = match value {
            None => {
                if let Some(default) = &self.default {
                    return Some(default.clone());
                }
                if !self.optional {
                    issues.push(FieldError::new(path, "required", "Required"));
                }
                return None;
            }
            Some(Value::Null) if self.nullable => return Some(Value::Null),
            Some(Value::Null) if !matches!(self.kind, Kind::Any) => {
                if let Some(default) = &self.default {
                    return Some(default.clone());
                }
                if self.optional {
                    return None;
                }
                issues.push(self.type_error(path, &Value::Null));
                return None;
            }
            Some(value) => value,
        };

        match &self.kind {
            Kind::Any => Some(value.clone()),
            Kind::String(rules) => self.parse_string(rules, value, path, issues),
            Kind::Number(rules) => self.parse_number(rules, value, path, issues),
            Kind::Boolean { coerce } => match (value, coerce) {
                (Value::Bool(b), _) => Some(Value::Bool(*b)),
                (Value::String(s), true) if s == "true" => Some(Value::Bool(true)),
                (Value::String(s), true) if s == "false" => Some(Value::Bool(false)),
                _ => {
                    issues.push(self.type_error(path, value));
                    None
                }
            },
            Kind::Array(rules) => self.parse_array(rules, value, path, issues),
            Kind::Object(rules) => self.parse_object(rules, value, path, issues),
            Kind::Literal(expected) => {
                if value == expected {
                    Some(value.clone())
                } else {
                    issues.push(FieldError::new(
                        path,
                        "literal",
                        format!("Invalid literal value, expected {}", expected),
                    ));
                    None
                }
            }
            Kind::OneOf(options) => {
                if options.contains(value) {
                    Some(value.clone())
                } else {
                    let expected: Vec<String> = options.iter().map(Value::to_string).collect();
                    issues.push(FieldError::new(
                        path,
                        "enum",
                        format!(
                            "Invalid enum value. Expected {}, received {}",
                            expected.join(" | "),
                            value
                        ),
                    ));
                    None
                }
            }
        }
    }

    fn parse_string(
        &self,
        rules: &StringRules,
        value: &Value,
        path: &str,
        issues: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let s = match (value, rules.coerce) {
            (Value::String(s), _) => s.clone(),
            (Value::Number(n), true) => n.to_string(),
            (Value::Bool(b), true) => b.to_string(),
            _ => {
                issues.push(self.type_error(path, value));
                return None;
            }
        };

        let before = issues.len();
        let length = s.chars().count();
        if let Some(min) = rules.min_length {
            if length < min {
                issues.push(FieldError::new(
                    path,
                    "min_length",
                    format!("String must contain at least {} character(s)", min),
                ));
            }
        }
        if let Some(max) = rules.max_length {
            if length > max {
                issues.push(FieldError::new(
                    path,
                    "max_length",
                    format!("String must contain at most {} character(s)", max),
                ));
            }
        }
        if rules.email {
            use validator::ValidateEmail;
            if !s.validate_email() {
                issues.push(FieldError::new(path, "email", "Invalid email"));
            }
        }
        if let Some(pattern) = &rules.pattern {
            if !pattern.is_match(&s) {
                issues.push(FieldError::new(
                    path,
                    "pattern",
                    format!("String must match pattern {}", pattern.as_str()),
                ));
            }
        }

        (issues.len() == before).then_some(Value::String(s))
    }

    fn parse_number(
        &self,
        rules: &NumberRules,
        value: &Value,
        path: &str,
        issues: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let parsed = match (value, rules.coerce) {
            (Value::Number(n), _) => Some(n.clone()),
            (Value::String(s), true) => parse_number_str(s.trim()),
            _ => None,
        };
        let Some((number, n)) = parsed.and_then(|num| num.as_f64().map(|f| (num, f))) else {
            issues.push(self.type_error(path, value));
            return None;
        };

        let whole = number.is_i64() || number.is_u64();
        if rules.integer && !whole && n.fract() != 0.0 {
            issues.push(FieldError::new(path, "integer", "Expected integer, received float"));
            return None;
        }

        let before = issues.len();
        if let Some(min) = rules.min {
            if n < min {
                issues.push(FieldError::new(
                    path,
                    "min",
                    format!("Number must be greater than or equal to {}", min),
                ));
            }
        }
        if let Some(max) = rules.max {
            if n > max {
                issues.push(FieldError::new(
                    path,
                    "max",
                    format!("Number must be less than or equal to {}", max),
                ));
            }
        }
        if issues.len() != before {
            return None;
        }

        if rules.integer && !whole && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
            return Some(Value::Number(Number::from(n as i64)));
        }
        Some(Value::Number(number))
    }

    fn parse_array(
        &self,
        rules: &ArrayRules,
        value: &Value,
        path: &str,
        issues: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let single;
        let items: &[Value] = match (value, rules.coerce) {
            (Value::Array(items), _) => items,
            (other, true) => {
                single = [other.clone()];
                &single
            }
            _ => {
                issues.push(self.type_error(path, value));
                return None;
            }
        };

        let before = issues.len();
        if let Some(min) = rules.min_items {
            if items.len() < min {
                issues.push(FieldError::new(
                    path,
                    "min_items",
                    format!("Array must contain at least {} element(s)", min),
                ));
            }
        }
        if let Some(max) = rules.max_items {
            if items.len() > max {
                issues.push(FieldError::new(
                    path,
                    "max_items",
                    format!("Array must contain at most {} element(s)", max),
                ));
            }
        }

        let decoded: Vec<Value> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                rules
                    .items
                    .parse(Some(item), &join_path(path, &i.to_string()), issues)
                    .unwrap_or(Value::Null)
            })
            .collect();

        (issues.len() == before).then_some(Value::Array(decoded))
    }

    fn parse_object(
        &self,
        rules: &ObjectRules,
        value: &Value,
        path: &str,
        issues: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let Value::Object(object) = value else {
            issues.push(self.type_error(path, value));
            return None;
        };

        let before = issues.len();
        let mut decoded = Map::new();
        for (name, shape) in &rules.fields {
            if let Some(v) = shape.parse(object.get(name), &join_path(path, name), issues) {
                decoded.insert(name.clone(), v);
            }
        }
        if rules.passthrough {
            for (key, v) in object {
                if !rules.fields.contains_key(key) {
                    decoded.insert(key.clone(), v.clone());
                }
            }
        }

        (issues.len() == before).then_some(Value::Object(decoded))
    }

    fn type_error(&self, path: &str, received: &Value) -> FieldError {
        FieldError::new(
            path,
            "type",
            format!("Expected {}, received {}", self.expected(), type_name(received)),
        )
    }
}

fn parse_number_str(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Number::from(u));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Schema for Shape {
    fn decode(&self, value: Value) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let decoded = self.parse(Some(&value), "", &mut issues);
        if issues.is_empty() {
            Ok(decoded.unwrap_or(Value::Null))
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// Any JSON value.
pub fn any() -> Shape {
    Shape::new(Kind::Any)
}

/// A string.
pub fn string() -> Shape {
    Shape::new(Kind::String(StringRules::default()))
}

/// Any finite number.
pub fn number() -> Shape {
    Shape::new(Kind::Number(NumberRules::default()))
}

/// A number without fractional part.
pub fn integer() -> Shape {
    Shape::new(Kind::Number(NumberRules {
        integer: true,
        ..NumberRules::default()
    }))
}

/// A boolean.
pub fn boolean() -> Shape {
    Shape::new(Kind::Boolean { coerce: false })
}

/// An array whose items all match `items`.
pub fn array(items: Shape) -> Shape {
    Shape::new(Kind::Array(ArrayRules {
        items: Box::new(items),
        min_items: None,
        max_items: None,
        coerce: false,
    }))
}

/// An object with no declared fields yet; add them with [`Shape::field`].
pub fn object() -> Shape {
    Shape::new(Kind::Object(ObjectRules::default()))
}

/// Exactly `value`.
pub fn literal(value: impl Into<Value>) -> Shape {
    Shape::new(Kind::Literal(value.into()))
}

/// One of the given values.
pub fn one_of<I, V>(values: I) -> Shape
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Shape::new(Kind::OneOf(values.into_iter().map(Into::into).collect()))
}
