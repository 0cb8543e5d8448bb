//! # Validation Failures
//!
//! Aggregated, structured validation errors. A failure is built per request
//! (or response) and carries every violation found, not just the first.

use crate::schema::{SchemaViolation, ViolationKind};
use std::fmt;

/// One violation, addressed by a dotted path such as `query.limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Group-prefixed path of the offending value.
    pub property_path: String,
    /// Human readable message, already prefixed with the path.
    pub message: String,
}

impl ValidationIssue {
    /// Creates an issue.
    pub fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
        }
    }

    /// Shapes a schema violation found below `prefix` (a group name,
    /// `headers` or `body`).
    pub fn from_violation(prefix: &str, violation: &SchemaViolation) -> Self {
        let path = violation.dotted_path(prefix);
        match &violation.kind {
            ViolationKind::Required { property } => Self {
                property_path: format!("{}.{}", path, property),
                message: format!("{} requires property \"{}\"", path, property),
            },
            ViolationKind::Other => Self {
                message: format!("{} {}", path, violation.message),
                property_path: path,
            },
        }
    }
}

/// Every issue found while validating one request or response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Issues in discovery order.
    pub errors: Vec<ValidationIssue>,
}

impl ValidationFailure {
    /// Adds one issue.
    pub fn push(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    /// Appends all of `other`'s issues to this failure.
    pub fn import_errors(&mut self, other: ValidationFailure) {
        self.errors.extend(other.errors);
    }

    /// True when nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `None` when valid, the failure otherwise.
    pub fn into_result(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }

    /// Whether any issue concerns `property_path` or something beneath it.
    pub fn mentions(&self, property_path: &str) -> bool {
        self.errors.iter().any(|e| {
            e.property_path == property_path
                || e.property_path
                    .strip_prefix(property_path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

impl From<Vec<ValidationIssue>> for ValidationFailure {
    fn from(errors: Vec<ValidationIssue>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "Validation failed: {}", messages.join("; "))
    }
}

impl std::error::Error for ValidationFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_import_errors_keeps_order() {
        let mut first = ValidationFailure::from(vec![ValidationIssue::new("path.id", "a")]);
        let second = ValidationFailure::from(vec![
            ValidationIssue::new("query.limit", "b"),
            ValidationIssue::new("query.offset", "c"),
        ]);
        first.import_errors(second);

        let paths: Vec<&str> = first.errors.iter().map(|e| e.property_path.as_str()).collect();
        assert_eq!(paths, vec!["path.id", "query.limit", "query.offset"]);
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationFailure::default().into_result().is_none());
        let failure = ValidationFailure::from(vec![ValidationIssue::new("body", "bad")]);
        assert!(failure.into_result().is_some());
    }

    #[test]
    fn test_required_violation_is_shaped() {
        let violation = SchemaViolation {
            path: vec![],
            kind: ViolationKind::Required {
                property: "petId".into(),
            },
            message: "\"petId\" is a required property".into(),
        };
        let issue = ValidationIssue::from_violation("path", &violation);
        assert_eq!(issue.property_path, "path.petId");
        assert_eq!(issue.message, "path requires property \"petId\"");
    }

    #[test]
    fn test_other_violation_reads_path_then_message() {
        let violation = SchemaViolation {
            path: vec!["limit".into()],
            kind: ViolationKind::Other,
            message: "must have a maximum value of 10".into(),
        };
        let issue = ValidationIssue::from_violation("query", &violation);
        assert_eq!(issue.property_path, "query.limit");
        assert_eq!(issue.message, "query.limit must have a maximum value of 10");
    }

    #[test]
    fn test_mentions() {
        let failure = ValidationFailure::from(vec![ValidationIssue::new("body.id", "x")]);
        assert!(failure.mentions("body.id"));
        assert!(failure.mentions("body"));
        assert!(!failure.mentions("body.i"));
    }

    #[test]
    fn test_display_joins_messages() {
        let failure = ValidationFailure::from(vec![
            ValidationIssue::new("a", "first"),
            ValidationIssue::new("b", "second"),
        ]);
        assert_eq!(failure.to_string(), "Validation failed: first; second");
    }
}
