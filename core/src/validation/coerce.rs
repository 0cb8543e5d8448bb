//! # Parameter Coercion
//!
//! Wire values arrive as strings. Before schema validation each declared
//! property is converted to the type its schema declares, in this order:
//!
//! 1. `array`: split on the `collectionFormat` delimiter, then coerce the items.
//! 2. `boolean`: `true/1/on/yes/y` are true, the literal `undefined` is
//!    absent, anything else is false.
//! 3. `integer` / `number`: parsed when the string is a finite number, left
//!    as-is otherwise so validation reports the original input.
//! 4. Absent optional values take their declared `default`.
//!
//! Defaults are applied last and are never split or coerced.

use crate::schema::ParamGroupSchema;
use crate::spec::CollectionFormat;
use serde_json::{Map, Number, Value};

/// Group data after coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercedGroup {
    /// The coerced values. Undeclared keys are passed through untouched.
    pub data: Map<String, Value>,
    /// Properties whose value came from a declared default.
    pub defaults_applied: Vec<String>,
}

/// Coerces the raw data of one parameter group.
pub fn coerce_group(schema: &ParamGroupSchema, raw: &Map<String, Value>) -> CoercedGroup {
    coerce_fields(schema.properties(), |name| schema.is_required(name), raw)
}

/// Coerces `raw` against an object schema's `properties`.
pub fn coerce_fields(
    properties: Option<&Map<String, Value>>,
    is_required: impl Fn(&str) -> bool,
    raw: &Map<String, Value>,
) -> CoercedGroup {
    let mut coerced = CoercedGroup {
        data: raw.clone(),
        defaults_applied: Vec::new(),
    };
    let Some(properties) = properties else {
        return coerced;
    };

    for (name, spec) in properties {
        let mut value = coerce_value(spec, coerced.data.get(name).cloned());
        if value.is_none() && !is_required(name) {
            if let Some(default) = spec.get("default") {
                value = Some(default.clone());
                coerced.defaults_applied.push(name.clone());
            }
        }
        match value {
            Some(value) => {
                coerced.data.insert(name.clone(), value);
            }
            None => {
                coerced.data.remove(name);
            }
        }
    }
    coerced
}

/// Coerces a single value against a property schema.
pub fn coerce_value(spec: &Value, value: Option<Value>) -> Option<Value> {
    let value = value?;
    match schema_type(spec) {
        Some("array") => {
            let format = CollectionFormat::from_keyword(spec.get("collectionFormat"));
            let items_type = spec.get("items").and_then(schema_type);
            match split_collection(value, format) {
                // an item that reads as absent stays as sent, the array keeps its length
                Value::Array(items) => Some(Value::Array(
                    items
                        .into_iter()
                        .map(|item| coerce_scalar(items_type, item.clone()).unwrap_or(item))
                        .collect(),
                )),
                other => Some(other),
            }
        }
        kind => coerce_scalar(kind, value),
    }
}

/// Splits a delimited wire string into an array of strings.
///
/// `multi` values are never split: a lone string is one occurrence. Empty
/// strings are left alone so they still read as empty.
pub fn split_collection(value: Value, format: CollectionFormat) -> Value {
    match value {
        Value::String(s) if !s.is_empty() => match format.delimiter() {
            Some(delimiter) => Value::Array(
                s.split(delimiter)
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            None => Value::Array(vec![Value::String(s)]),
        },
        other => other,
    }
}

/// Lenient boolean parsing. `None` means "treat as absent".
///
/// Unrecognized tokens are false rather than an error.
pub fn coerce_boolean(raw: &str) -> Option<bool> {
    if raw == "undefined" {
        return None;
    }
    Some(matches!(
        raw.to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes" | "y"
    ))
}

/// Parses a finite number, preferring an integer representation.
pub fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::from(int));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn coerce_scalar(kind: Option<&str>, value: Value) -> Option<Value> {
    match (kind, value) {
        (Some("boolean"), Value::String(s)) => coerce_boolean(&s).map(Value::Bool),
        (Some("integer") | Some("number"), Value::String(s)) => {
            Some(parse_number(&s).unwrap_or(Value::String(s)))
        }
        (_, value) => Some(value),
    }
}

fn schema_type(spec: &Value) -> Option<&str> {
    spec.get("type").and_then(Value::as_str)
}
