//! Validation error types and JSON error format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path to the offending value (`""` for the root, `params.id`, `items.0`)
    pub path: String,
    /// Human-readable error message
    pub message: String,
    /// Rule code that failed (e.g. "required", "min_length", "email")
    #[serde(skip)]
    pub code: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(
        path: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Re-root this error under `prefix`.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.path = join_path(prefix, &self.path);
        self
    }
}

/// Validation error containing every violation found in a value.
///
/// Serializes to the wire format used for rejected requests:
///
/// ```json
/// { "error": "Validation failed", "details": [{ "path": "name", "message": "..." }] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Summary message (default: "Validation failed")
    #[serde(rename = "error")]
    pub message: String,
    /// One entry per violation
    #[serde(rename = "details")]
    pub issues: Vec<FieldError>,
}

impl ValidationError {
    /// Create a new validation error from a list of issues.
    pub fn new(issues: Vec<FieldError>) -> Self {
        Self {
            message: "Validation failed".to_string(),
            issues,
        }
    }

    /// Create a validation error for a single path.
    pub fn single(
        path: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(vec![FieldError::new(path, code, message)])
    }

    /// Check if there are any issues.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Add an issue.
    pub fn add(&mut self, issue: FieldError) {
        self.issues.push(issue);
    }

    /// Check whether some issue points at `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }

    /// Convert `validator` errors to our format, flattening nested structs and lists
    /// into dotted paths.
    pub fn from_validator_errors(errors: validator::ValidationErrors) -> Self {
        let mut issues = Vec::new();
        collect_validator_errors(&errors, "", &mut issues);
        issues.sort_by(|a, b| a.path.cmp(&b.path));
        Self::new(issues)
    }

    pub(crate) fn from_serde(err: serde_json::Error) -> Self {
        Self::single("", "type", err.to_string())
    }
}

fn collect_validator_errors(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<FieldError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let field = field.to_string();
        let path = if field == "__all__" {
            prefix.to_string()
        } else {
            join_path(prefix, &field)
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| default_validator_message(error));
                    out.push(FieldError::new(path.clone(), error.code.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validator_errors(nested, &path, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validator_errors(nested, &join_path(&path, &index.to_string()), out);
                }
            }
        }
    }
}

fn default_validator_message(error: &validator::ValidationError) -> String {
    let param = |name: &str| error.params.get(name).map(|v| v.to_string());

    match error.code.as_ref() {
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("Length must be between {} and {}", min, max),
            (Some(min), None) => format!("Length must be at least {}", min),
            (None, Some(max)) => format!("Length must be at most {}", max),
            (None, None) => "Invalid length".to_string(),
        },
        "range" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("Value must be between {} and {}", min, max),
            (Some(min), None) => format!("Value must be at least {}", min),
            (None, Some(max)) => format!("Value must be at most {}", max),
            (None, None) => "Value out of range".to_string(),
        },
        "email" => "Invalid email".to_string(),
        "url" => "Invalid url".to_string(),
        code => format!("Failed `{}` validation", code),
    }
}

/// Join two dotted path segments, skipping empty ones.
pub fn join_path(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}.{}", parent, child),
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} issue(s)", self.message, self.issues.len())
    }
}

impl std::error::Error for ValidationError {}
