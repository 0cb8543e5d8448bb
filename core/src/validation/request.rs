//! # Request Validation
//!
//! Coerces and validates every parameter group of an inbound request,
//! collecting all issues into one `ValidationFailure`.
//!
//! Group rules:
//! - `header`: keys compared in lower case.
//! - `path`: empty values count as absent, undeclared keys are errors.
//! - `query` / `formData`: `allowEmptyValue` hides errors on empty values.
//! - `body`: validated as-is, never coerced.

use crate::schema::{ParamGroupSchema, SchemaViolation};
use crate::spec::{Operation, ParamGroup};
use crate::validation::coerce::coerce_group;
use crate::validation::failure::{ValidationFailure, ValidationIssue};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

/// The five request locations, as supplied by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestView {
    /// Request headers.
    pub header: Map<String, Value>,
    /// Route-matched path values.
    pub path: Map<String, Value>,
    /// Query string values.
    pub query: Map<String, Value>,
    /// Decoded request payload, if one was sent.
    pub body: Option<Value>,
    /// Form fields, when the request is a form submission.
    pub form_data: Option<Map<String, Value>>,
    /// `group.name` of every value filled in from a declared default.
    pub defaults_applied: BTreeSet<String>,
}

/// A borrowed view of one group's data.
#[derive(Debug)]
pub enum GroupData<'a> {
    /// String-keyed values (header, path, query, formData).
    Fields(&'a mut Map<String, Value>),
    /// The single request payload.
    Payload(Option<&'a Value>),
}

impl RequestView {
    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.header.insert(name.to_string(), value.into());
        self
    }

    /// Adds a path value.
    pub fn with_path(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.path.insert(name.to_string(), value.into());
        self
    }

    /// Adds a query value.
    pub fn with_query(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.query.insert(name.to_string(), value.into());
        self
    }

    /// Sets the payload.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a form field, marking the request as a form submission.
    pub fn with_form_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.form_data
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value.into());
        self
    }

    /// The data of one group.
    pub fn group_mut(&mut self, group: ParamGroup) -> GroupData<'_> {
        match group {
            ParamGroup::Header => GroupData::Fields(&mut self.header),
            ParamGroup::Path => GroupData::Fields(&mut self.path),
            ParamGroup::Query => GroupData::Fields(&mut self.query),
            ParamGroup::FormData => GroupData::Fields(self.form_data.get_or_insert_with(Map::new)),
            ParamGroup::Body => GroupData::Payload(self.body.as_ref()),
        }
    }
}

/// Validates `request` against `operation`. Group data is coerced in place so
/// later steps see typed values. Returns `None` when the request is valid.
pub fn validate_request(
    request: &mut RequestView,
    operation: &Operation,
) -> Option<ValidationFailure> {
    let mut failure = ValidationFailure::default();

    for (group, schema) in &operation.param_group_schemas {
        let (issues, defaults) = match request.group_mut(*group) {
            GroupData::Fields(fields) => validate_fields(*group, schema, fields),
            GroupData::Payload(body) => (validate_payload(schema, body), Vec::new()),
        };
        request
            .defaults_applied
            .extend(defaults.into_iter().map(|name| format!("{}.{}", group, name)));
        failure.import_errors(issues.into());
    }

    if !failure.is_empty() {
        debug!(
            operation = %operation.id,
            errors = failure.errors.len(),
            "request validation failed"
        );
    }
    failure.into_result()
}

fn validate_fields(
    group: ParamGroup,
    schema: &ParamGroupSchema,
    fields: &mut Map<String, Value>,
) -> (Vec<ValidationIssue>, Vec<String>) {
    let mut issues = Vec::new();

    if group.is_case_insensitive() {
        *fields = std::mem::take(fields)
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
    }

    if group.rejects_unknown_keys() {
        for key in fields.keys().filter(|k| schema.property(k).is_none()) {
            let path = format!("{}.{}", group, key);
            issues.push(ValidationIssue::new(
                path.clone(),
                format!("{} is an invalid path segment", path),
            ));
        }
    }

    if group.treats_empty_as_absent() {
        fields.retain(|_, v| v.as_str() != Some(""));
    }

    let defaults_applied = if group.is_coerced() {
        let coerced = coerce_group(schema, fields);
        *fields = coerced.data;
        coerced.defaults_applied
    } else {
        Vec::new()
    };

    let instance = Value::Object(fields.clone());
    issues.extend(
        schema
            .validator()
            .violations(&instance)
            .iter()
            .filter(|v| !(group.honors_allow_empty_value() && allows_empty(schema, fields, v)))
            .map(|v| ValidationIssue::from_violation(group.as_str(), v)),
    );
    (issues, defaults_applied)
}

fn validate_payload(schema: &ParamGroupSchema, body: Option<&Value>) -> Vec<ValidationIssue> {
    match body {
        Some(body) => schema
            .validator()
            .violations(body)
            .iter()
            .map(|v| ValidationIssue::from_violation(ParamGroup::Body.as_str(), v))
            .collect(),
        None => schema
            .body_parameter
            .iter()
            .filter(|name| schema.is_required(name))
            .map(|name| {
                ValidationIssue::new(
                    format!("body.{}", name),
                    format!("body requires property \"{}\"", name),
                )
            })
            .collect(),
    }
}

/// True when the violated property declares `allowEmptyValue` and its value
/// is empty (absent, null, false or `""`, but never `0`).
fn allows_empty(
    schema: &ParamGroupSchema,
    fields: &Map<String, Value>,
    violation: &SchemaViolation,
) -> bool {
    let Some(property) = violation.property() else {
        return false;
    };
    let declared = schema
        .property(property)
        .and_then(|spec| spec.get("allowEmptyValue"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    declared && is_empty_value(fields.get(property))
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
