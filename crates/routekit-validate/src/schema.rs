//! The schema contract consumed by routekit.

use crate::error::ValidationError;
use serde_json::Value;
use std::sync::Arc;

/// An opaque validator/decoder for a JSON value.
///
/// Routekit never inspects a schema; it only asks it to check a value and to
/// decode it (apply defaults, coerce types, strip unknown keys). Implementations
/// must report every violation they find, not just the first one.
///
/// ## Example
///
/// ```rust,ignore
/// use routekit_validate::{Schema, ValidationError};
/// use serde_json::Value;
///
/// struct NonNull;
///
/// impl Schema for NonNull {
///     fn decode(&self, value: Value) -> Result<Value, ValidationError> {
///         if value.is_null() {
///             return Err(ValidationError::single("", "required", "Required"));
///         }
///         Ok(value)
///     }
/// }
/// ```
pub trait Schema: Send + Sync + 'static {
    /// Decode `value`, returning the coerced form or every violation.
    fn decode(&self, value: Value) -> Result<Value, ValidationError>;

    /// Check `value` without keeping the decoded form.
    fn check(&self, value: &Value) -> Result<(), ValidationError> {
        self.decode(value.clone()).map(|_| ())
    }
}

/// Shared, type-erased schema handle.
pub type SchemaRef = Arc<dyn Schema>;

/// Schema accepting any value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyValue;

impl Schema for AnyValue {
    fn decode(&self, value: Value) -> Result<Value, ValidationError> {
        Ok(value)
    }
}

/// Shorthand for `Arc::new(AnyValue)`.
pub fn any_value() -> SchemaRef {
    Arc::new(AnyValue)
}
