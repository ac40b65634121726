//! Schemas backed by Rust types.
//!
//! [`Typed<T>`] decodes through serde: defaults come from `#[serde(default)]`,
//! unknown keys are dropped unless `T` keeps them. [`Validated<T>`] also runs
//! the `validator` rules declared on `T`.

use crate::error::ValidationError;
use crate::schema::{Schema, SchemaRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use validator::Validate;

/// Schema that decodes values into `T` and back.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn decode(&self, value: Value) -> Result<Value, ValidationError> {
        let typed: T = serde_json::from_value(value).map_err(ValidationError::from_serde)?;
        serde_json::to_value(typed).map_err(ValidationError::from_serde)
    }
}

/// Schema that decodes into `T` and runs its `validator` rules.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, Validate)]
/// struct CreateUser {
///     #[validate(length(min = 1))]
///     name: String,
///     #[validate(email)]
///     email: String,
/// }
///
/// let schema = validated::<CreateUser>();
/// ```
pub struct Validated<T>(PhantomData<fn() -> T>);

impl<T> Validated<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Validated<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for Validated<T>
where
    T: DeserializeOwned + Serialize + Validate + 'static,
{
    fn decode(&self, value: Value) -> Result<Value, ValidationError> {
        let typed: T = serde_json::from_value(value).map_err(ValidationError::from_serde)?;
        typed
            .validate()
            .map_err(ValidationError::from_validator_errors)?;
        serde_json::to_value(typed).map_err(ValidationError::from_serde)
    }
}

/// Input type of routes that take nothing. Encodes as `{}`.
///
/// `()` cannot stand in here: it decodes only from `null`, while an empty
/// request extracts to `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoInput {}

/// Shared [`Typed<T>`] schema.
pub fn typed<T>() -> SchemaRef
where
    T: DeserializeOwned + Serialize + 'static,
{
    Arc::new(Typed::<T>::new())
}

/// Shared [`Validated<T>`] schema.
pub fn validated<T>() -> SchemaRef
where
    T: DeserializeOwned + Serialize + Validate + 'static,
{
    Arc::new(Validated::<T>::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, Validate)]
    struct CreateUser {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(email)]
        email: String,
        #[serde(default = "default_role")]
        role: String,
    }

    fn default_role() -> String {
        "member".to_string()
    }

    #[derive(Debug, Serialize, Deserialize, Validate)]
    struct Team {
        #[validate(nested)]
        members: Vec<CreateUser>,
    }

    #[test]
    fn typed_applies_serde_defaults() {
        let decoded = Typed::<CreateUser>::new()
            .decode(json!({"name": "Ada", "email": "ada@example.com", "extra": 1}))
            .unwrap();
        assert_eq!(
            decoded,
            json!({"name": "Ada", "email": "ada@example.com", "role": "member"})
        );
    }

    #[test]
    fn typed_reports_serde_errors_at_root() {
        let err = Typed::<CreateUser>::new().decode(json!({"name": 5})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.issues[0].path, "");
        assert_eq!(err.issues[0].code, "type");
    }

    #[test]
    fn validated_collects_all_rule_failures() {
        let err = Validated::<CreateUser>::new()
            .decode(json!({"name": "", "email": "not-an-email"}))
            .unwrap_err();

        assert_eq!(err.len(), 2);
        assert!(err.has_path("name"));
        assert!(err.has_path("email"));
        let name = err.issues.iter().find(|i| i.path == "name").unwrap();
        assert_eq!(name.message, "Name is required");
    }

    #[test]
    fn validated_flattens_nested_lists() {
        let err = validated::<Team>()
            .decode(json!({"members": [
                {"name": "Ada", "email": "ada@example.com"},
                {"name": "Bob", "email": "bob"}
            ]}))
            .unwrap_err();

        assert_eq!(err.issues[0].path, "members.1.email");
        assert_eq!(err.issues[0].message, "Invalid email");
    }

    #[test]
    fn no_input_decodes_empty_objects() {
        assert_eq!(typed::<NoInput>().decode(json!({})).unwrap(), json!({}));
        assert_eq!(serde_json::to_value(NoInput::default()).unwrap(), json!({}));
        assert!(typed::<()>().check(&json!({})).is_err());
    }
}
