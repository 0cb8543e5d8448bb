#![deny(missing_docs)]

//! # Response Schemas
//!
//! One `ResponseSchema` per declared response key (`"200"`, `"404"`,
//! `"default"`), carrying the compiled body schema and a synthesized object
//! schema for the declared response headers.

use crate::error::ContractResult;
use crate::schema::compiled::SchemaValidator;
use crate::schema::groups::{compile, object_schema, property_fragment};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// The declared contract for one response key.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    /// Response key as written (status code or `default`).
    pub id: String,
    /// Response description.
    pub description: Option<String>,
    /// Compiled payload schema, if declared.
    pub body_schema: Option<SchemaValidator>,
    /// Compiled header schema, if any headers are declared. Property names
    /// are lower-case.
    pub headers_schema: Option<SchemaValidator>,
}

impl ResponseSchema {
    /// The numeric status code, when the key is one.
    pub fn status_code(&self) -> Option<u16> {
        self.id.parse().ok()
    }
}

/// Builds the response schemas of one operation from its resolved
/// `responses` object.
pub fn build_response_schemas(
    operation_id: &str,
    responses: Option<&Value>,
    root: &Value,
) -> ContractResult<IndexMap<String, ResponseSchema>> {
    let mut schemas = IndexMap::new();
    let Some(responses) = responses.and_then(Value::as_object) else {
        return Ok(schemas);
    };

    for (id, response) in responses.iter().filter(|(k, _)| !k.starts_with("x-")) {
        let location = format!("responses.{}", id);

        let body_schema = match response.get("schema") {
            Some(schema) => Some(compile(operation_id, &location, schema, root)?),
            None => None,
        };

        let headers_schema = match response.get("headers").and_then(Value::as_object) {
            Some(headers) if !headers.is_empty() => {
                let schema = headers_object_schema(headers);
                Some(compile(
                    operation_id,
                    &format!("{}.headers", location),
                    &schema,
                    root,
                )?)
            }
            _ => None,
        };

        schemas.insert(
            id.clone(),
            ResponseSchema {
                id: id.clone(),
                description: response
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                body_schema,
                headers_schema,
            },
        );
    }
    Ok(schemas)
}

fn headers_object_schema(headers: &Map<String, Value>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, spec) in headers {
        let name = name.to_ascii_lowercase();
        if spec.get("required").and_then(Value::as_bool) == Some(true) {
            required.push(name.clone());
        }
        properties.insert(name, property_fragment(spec));
    }
    object_schema(properties, &required)
}
