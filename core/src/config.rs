#![deny(missing_docs)]

//! # Contract Options
//!
//! Load-time settings that shape how a document is turned into contracts.
//! Options can be built in code or read from a YAML / JSON file.

use crate::error::{ContractError, ContractResult};
use serde::Deserialize;
use std::path::Path;

/// Default location of the served API document, relative to `basePath`.
pub const DEFAULT_DOCS_PATH: &str = "/api-docs";

/// Default name of the per-scheme extension that enables OR scope matching.
pub const DEFAULT_OR_SCOPES_EXTENSION: &str = "x-or-scopes";

/// Settings applied when a document is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContractOptions {
    /// Path (joined under `basePath`) where the raw document is exposed.
    pub docs_path: String,
    /// Reject operations with more than one body parameter instead of
    /// keeping the first one.
    pub strict_body_parameters: bool,
    /// Security scheme extension that switches scope matching to "any of".
    pub or_scopes_extension: String,
}

impl Default for ContractOptions {
    fn default() -> Self {
        Self {
            docs_path: DEFAULT_DOCS_PATH.to_string(),
            strict_body_parameters: false,
            or_scopes_extension: DEFAULT_OR_SCOPES_EXTENSION.to_string(),
        }
    }
}

impl ContractOptions {
    /// Parses options from a YAML string (JSON is valid YAML).
    pub fn from_str_yaml(yaml: &str) -> ContractResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ContractError::Parse(format!("Failed to parse options: {}", e)))
    }

    /// Reads options from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> ContractResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        if crate::spec::document::is_yaml_file(path) {
            Self::from_str_yaml(&contents)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let opts = ContractOptions::default();
        assert_eq!(opts.docs_path, "/api-docs");
        assert!(!opts.strict_body_parameters);
        assert_eq!(opts.or_scopes_extension, "x-or-scopes");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let opts = ContractOptions::from_str_yaml("strictBodyParameters: true\n").unwrap();
        assert_eq!(
            opts,
            ContractOptions {
                strict_body_parameters: true,
                ..ContractOptions::default()
            }
        );
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{ "docsPath": "/docs" }"#).unwrap();

        let opts = ContractOptions::from_file(&path).unwrap();
        assert_eq!(opts.docs_path, "/docs");
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ContractOptions::from_str_yaml("docsPath: [").unwrap_err();
        assert!(matches!(err, ContractError::Parse(_)));
    }
}
