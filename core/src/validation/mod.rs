#![deny(missing_docs)]

//! # Validation Module
//!
//! Request coercion and validation, response checking, and the aggregated
//! failure type both report through.

pub mod coerce;
pub mod failure;
pub mod request;
pub mod response;

pub use coerce::{coerce_group, CoercedGroup};
pub use failure::{ValidationFailure, ValidationIssue};
pub use request::{validate_request, GroupData, RequestView};
pub use response::{validate_response, ResponseError, ResponseView};
