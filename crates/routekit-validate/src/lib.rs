//! # routekit-validate
//!
//! The schema side of a routekit route table. Routekit treats every schema as
//! an opaque [`Schema`]: it asks it to check a value and to decode it, and
//! reports every violation as a [`ValidationError`].
//!
//! Two engines ship with the crate:
//!
//! - [`shape`]: dynamic shapes with defaults, optional fields, string coercion
//!   for query and path values, and zod-style messages.
//! - [`Typed`] / [`Validated`]: schemas derived from Rust types through serde,
//!   optionally running `validator` rules.
//!
//! ## Example
//!
//! ```rust,ignore
//! use routekit_validate::prelude::*;
//!
//! let input = shape::object()
//!     .field("name", shape::string().min_length(1))
//!     .field("email", shape::string().email());
//!
//! let err = input.decode(serde_json::json!({"name": ""})).unwrap_err();
//! assert_eq!(err.len(), 2);
//! ```
//!
//! ## Error Format
//!
//! ```json
//! {
//!   "error": "Validation failed",
//!   "details": [
//!     {"path": "name", "message": "String must contain at least 1 character(s)"},
//!     {"path": "email", "message": "Required"}
//!   ]
//! }
//! ```

mod error;
mod schema;
pub mod shape;
mod typed;

pub use error::{join_path, FieldError, ValidationError};
pub use schema::{any_value, AnyValue, Schema, SchemaRef};
pub use shape::Shape;
pub use typed::{typed, validated, NoInput, Typed, Validated};

// Derive and trait for `Validated<T>` targets.
pub use validator::Validate;

/// Prelude module for validation
pub mod prelude {
    pub use crate::error::{FieldError, ValidationError};
    pub use crate::schema::{any_value, Schema, SchemaRef};
    pub use crate::shape::{self, Shape};
    pub use crate::typed::{typed, validated, NoInput, Typed, Validated};
    pub use validator::Validate;
}
