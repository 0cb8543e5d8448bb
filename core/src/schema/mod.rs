#![deny(missing_docs)]

//! # Schema Module
//!
//! JSON Schemas built from resolved operations and compiled once per load.

pub mod compiled;
pub mod groups;
pub mod responses;

pub use compiled::{SchemaValidator, SchemaViolation, ViolationKind};
pub use groups::{build_group_schemas, ParamGroupSchema};
pub use responses::{build_response_schemas, ResponseSchema};
