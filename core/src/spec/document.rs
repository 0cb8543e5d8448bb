#![deny(missing_docs)]

//! # Document Loading
//!
//! Reads a Swagger 2.0 document from disk or memory and applies the
//! document-level defaults the rest of the crate relies on.

use crate::error::{ContractError, ContractResult};
use serde_json::{Map, Value};
use std::path::Path;

/// Base path assumed when the document does not declare one.
pub const DEFAULT_BASE_PATH: &str = "/";

/// A loaded API document.
///
/// The raw JSON is kept untouched (apart from defaults) so it can be served
/// as-is and used as the root for `$ref` lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    raw: Value,
}

impl SpecDocument {
    /// Wraps an in-memory document, applying defaults.
    pub fn from_value(raw: Value) -> ContractResult<Self> {
        let mut raw = raw;
        let root = raw.as_object_mut().ok_or_else(|| {
            ContractError::Parse("API document root must be an object".to_string())
        })?;
        let has_base_path = root
            .get("basePath")
            .and_then(Value::as_str)
            .is_some_and(|p| !p.is_empty());
        if !has_base_path {
            root.insert(
                "basePath".to_string(),
                Value::String(DEFAULT_BASE_PATH.to_string()),
            );
        }
        Ok(Self { raw })
    }

    /// Parses a document from a YAML string (JSON is valid YAML).
    pub fn from_yaml_str(yaml: &str) -> ContractResult<Self> {
        let raw: Value = serde_yaml::from_str(yaml)
            .map_err(|e| ContractError::Parse(format!("Failed to parse API YAML: {}", e)))?;
        Self::from_value(raw)
    }

    /// Parses a document from a JSON string.
    pub fn from_json_str(json: &str) -> ContractResult<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Loads a document from disk. `.yaml` / `.yml` files are parsed as YAML,
    /// anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> ContractResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        if is_yaml_file(path) {
            Self::from_yaml_str(&contents)
        } else {
            Self::from_json_str(&contents)
        }
    }

    /// The raw document, including applied defaults.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Consumes the wrapper, returning the raw document.
    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// The document's `basePath`.
    pub fn base_path(&self) -> &str {
        self.raw
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BASE_PATH)
    }

    /// The `paths` object, if any.
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.raw.get("paths").and_then(Value::as_object)
    }

    /// The `securityDefinitions` object, if any.
    pub fn security_definitions(&self) -> Option<&Map<String, Value>> {
        self.raw.get("securityDefinitions").and_then(Value::as_object)
    }

    /// A top-level string list such as `consumes` or `produces`.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        string_list(self.raw.get(key))
    }
}

/// Returns true for `.yaml` / `.yml` paths.
pub fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Reads a JSON array of strings, skipping anything that is not a string.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
