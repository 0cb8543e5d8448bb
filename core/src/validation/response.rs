//! # Response Validation
//!
//! Checks an observed response against the schema declared for the expected
//! status: status code, headers, body and content type. All checks run and
//! their issues are reported together.

use crate::schema::ResponseSchema;
use crate::spec::Operation;
use crate::validation::coerce::coerce_fields;
use crate::validation::failure::{ValidationFailure, ValidationIssue};
use derive_more::{Display, From};
use serde_json::{Map, Value};

/// HTTP status for which the content type is never checked.
const NO_CONTENT: u16 = 204;

/// An observed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseView {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: Map<String, Value>,
    /// Decoded payload (`Null` when there is none).
    pub body: Value,
}

impl ResponseView {
    /// A response with the given status and no headers or body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Sets the payload.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// A header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Why a response does not match its contract.
#[derive(Debug, Display, From)]
pub enum ResponseError {
    /// The operation declares no response under the expected key.
    #[from(ignore)]
    #[display("No response schema found for status {status}")]
    NoResponseSchema {
        /// The key that was looked up.
        status: String,
    },

    /// One or more checks failed.
    #[display("{_0}")]
    Invalid(ValidationFailure),
}

impl ResponseError {
    /// HTTP status to report: a broken response is a server-side failure.
    pub fn status(&self) -> u16 {
        500
    }
}

impl std::error::Error for ResponseError {}

/// Validates `response` against the schema declared under `expected_status`.
pub fn validate_response(
    response: &ResponseView,
    expected_status: &str,
    operation: &Operation,
) -> Result<(), ResponseError> {
    let schema = operation
        .response_schemas
        .get(expected_status)
        .ok_or_else(|| ResponseError::NoResponseSchema {
            status: expected_status.to_string(),
        })?;

    let mut failure = ValidationFailure::default();
    check_status(response, schema, &mut failure);
    check_headers(response, schema, &mut failure);
    check_body(response, schema, &mut failure);
    check_content_type(response, operation, &mut failure);

    match failure.into_result() {
        Some(failure) => Err(ResponseError::Invalid(failure)),
        None => Ok(()),
    }
}

fn check_status(response: &ResponseView, schema: &ResponseSchema, failure: &mut ValidationFailure) {
    if let Some(expected) = schema.status_code() {
        if expected != response.status {
            failure.push(ValidationIssue::new(
                "status",
                format!(
                    "HTTP response code {} was expected to be {}",
                    response.status, expected
                ),
            ));
        }
    }
}

fn check_headers(
    response: &ResponseView,
    schema: &ResponseSchema,
    failure: &mut ValidationFailure,
) {
    let Some(headers_schema) = &schema.headers_schema else {
        return;
    };
    let headers: Map<String, Value> = response
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
        .collect();
    let required: Vec<&str> = headers_schema
        .schema()
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let coerced = coerce_fields(
        headers_schema
            .schema()
            .get("properties")
            .and_then(Value::as_object),
        |name| required.contains(&name),
        &headers,
    );

    let instance = Value::Object(coerced.data);
    for violation in headers_schema.violations(&instance) {
        failure.push(ValidationIssue::from_violation("headers", &violation));
    }
}

fn check_body(response: &ResponseView, schema: &ResponseSchema, failure: &mut ValidationFailure) {
    let Some(body_schema) = &schema.body_schema else {
        return;
    };
    let issues: Vec<ValidationIssue> = body_schema
        .violations(&response.body)
        .iter()
        .map(|v| ValidationIssue::from_violation("body", v))
        .collect();
    let Some((first, rest)) = issues.split_first() else {
        return;
    };

    let mut message = first.message.clone();
    for issue in rest {
        message.push_str(&format!("\n\t - {} - {}", issue.property_path, issue.message));
    }
    failure.push(ValidationIssue::new(first.property_path.clone(), message));
}

fn check_content_type(
    response: &ResponseView,
    operation: &Operation,
    failure: &mut ValidationFailure,
) {
    if response.status == NO_CONTENT || operation.produces.is_empty() {
        return;
    }
    let content_type = response.header("content-type").and_then(Value::as_str);
    if content_type.is_none() && response.body.is_null() {
        return;
    }

    let content_type = content_type.unwrap_or_default();
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    let expected = operation
        .produces
        .iter()
        .any(|p| p.eq_ignore_ascii_case(media_type));
    if !expected {
        failure.push(ValidationIssue::new(
            "headers.content-type",
            format!("Response content type '{}' was not expected", content_type),
        ));
    }
}
