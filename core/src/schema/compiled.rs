#![deny(missing_docs)]

//! # Compiled Schemas
//!
//! Thin wrapper around a `jsonschema` validator compiled once at load time
//! (Draft 4, the dialect Swagger 2.0 schemas are written in). Violations are
//! reported as `SchemaViolation`s so callers can shape their own messages.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A schema and its compiled validator. Cheap to clone.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: Arc<Value>,
    compiled: Arc<Validator>,
}

// Manual Debug implementation because the compiled validator does not implement Debug.
impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// What kind of rule a violation broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required property is missing from the object at `path`.
    Required {
        /// Name of the missing property.
        property: String,
    },
    /// Any other keyword failure.
    Other,
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Decoded instance path segments (empty for the root).
    pub path: Vec<String>,
    /// The failed rule.
    pub kind: ViolationKind,
    /// Validator message.
    pub message: String,
}

impl SchemaViolation {
    /// The top-level property the violation concerns, if any.
    pub fn property(&self) -> Option<&str> {
        match (&self.kind, self.path.first()) {
            (_, Some(first)) => Some(first.as_str()),
            (ViolationKind::Required { property }, None) => Some(property.as_str()),
            (ViolationKind::Other, None) => None,
        }
    }

    /// Dotted path below `prefix` (`query.tags.0`).
    pub fn dotted_path(&self, prefix: &str) -> String {
        std::iter::once(prefix)
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl SchemaValidator {
    /// Compiles `schema`. The error is the compiler's message.
    pub fn compile(schema: Value) -> Result<Self, String> {
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft4)
            .build(&schema)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            schema: Arc::new(schema),
            compiled: Arc::new(compiled),
        })
    }

    /// The schema this validator was compiled from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Returns true when `instance` satisfies the schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }

    /// Every violation of `instance`, in validator order.
    pub fn violations(&self, instance: &Value) -> Vec<SchemaViolation> {
        self.compiled
            .iter_errors(instance)
            .map(|error| {
                let kind = match &error.kind {
                    ValidationErrorKind::Required { property } => ViolationKind::Required {
                        property: property
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| property.to_string()),
                    },
                    _ => ViolationKind::Other,
                };
                SchemaViolation {
                    path: split_instance_path(&error.instance_path.to_string()),
                    kind,
                    message: error.to_string(),
                }
            })
            .collect()
    }
}

/// Splits a JSON Pointer (`/a/b~1c`) into decoded segments.
fn split_instance_path(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}
