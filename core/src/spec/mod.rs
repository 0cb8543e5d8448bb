#![deny(missing_docs)]

//! # Spec Module
//!
//! Loading a Swagger 2.0 document and flattening it into operations.

pub mod document;
pub mod operation;
pub mod refs;
pub mod resolver;

pub use document::SpecDocument;
pub use operation::{
    CollectionFormat, HttpMethod, Operation, ParamGroup, Parameter, ScopeMode,
    SecurityRequirement,
};
pub use refs::RefResolver;
pub use resolver::resolve;
