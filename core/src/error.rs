//! # Error Handling
//!
//! Provides the `ContractError` enum raised while loading a document and
//! building the per-operation contracts. Every variant is a configuration
//! error: it is reported once at load time and never retried.

use derive_more::{Display, From};

/// The load-time error enum.
///
/// We use `derive_more` for boilerplate.
/// Only `Io` and `Json` convert implicitly; the rest are built explicitly.
#[derive(Debug, Display, From)]
pub enum ContractError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[display("JSON Error: {_0}")]
    Json(serde_json::Error),

    /// The document could not be parsed as YAML or JSON.
    #[from(ignore)]
    #[display("Parse Error: {_0}")]
    Parse(String),

    /// A `$ref` points at a location that does not exist in the document.
    #[from(ignore)]
    #[display("Invalid schema reference: {reference} (missing segment '{segment}')")]
    BrokenReference {
        /// The reference as written in the document.
        reference: String,
        /// The first path segment that could not be followed.
        segment: String,
    },

    /// An operation has no `operationId` and so cannot be addressed.
    #[from(ignore)]
    #[display("Operation {method} {path} is missing an operationId")]
    MissingOperationId {
        /// HTTP verb of the operation.
        method: String,
        /// Path template of the operation.
        path: String,
    },

    /// Two operations share the same `operationId`.
    #[from(ignore)]
    #[display("Duplicate operationId '{_0}'")]
    DuplicateOperationId(String),

    /// A parameter is malformed (unknown `in`, missing `name`, ...).
    #[from(ignore)]
    #[display("Invalid parameter in operation '{operation}': {message}")]
    InvalidParameter {
        /// Owning operation id.
        operation: String,
        /// What is wrong with the parameter.
        message: String,
    },

    /// More than one body parameter while strict body parameters are enabled.
    #[from(ignore)]
    #[display("Operation '{_0}' declares more than one body parameter")]
    MultipleBodyParameters(String),

    /// A resolved schema fragment was rejected by the JSON Schema compiler.
    #[from(ignore)]
    #[display("Invalid schema for '{operation}' at {location}: {message}")]
    InvalidSchema {
        /// Owning operation id.
        operation: String,
        /// Which group or response the schema belongs to.
        location: String,
        /// Compiler message.
        message: String,
    },

    /// No terminal handler could be resolved for an operation.
    #[from(ignore)]
    #[display("Missing operation handler for '{_0}'")]
    MissingHandler(String),

    /// Generic errors.
    #[from(ignore)]
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for ContractError {}

/// Helper type alias for Result using ContractError.
pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let err: ContractError = io_err.into();
        assert!(matches!(err, ContractError::Io(_)));
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ContractError = json_err.into();
        assert!(matches!(err, ContractError::Json(_)));
    }

    #[test]
    fn test_broken_reference_display() {
        let err = ContractError::BrokenReference {
            reference: "#/definitions/Pet".into(),
            segment: "Pet".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid schema reference: #/definitions/Pet (missing segment 'Pet')"
        );
    }

    #[test]
    fn test_missing_handler_display() {
        let err = ContractError::MissingHandler("listPets".into());
        assert_eq!(err.to_string(), "Missing operation handler for 'listPets'");
    }
}
