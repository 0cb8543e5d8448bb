#![deny(missing_docs)]

//! # Security Module
//!
//! Authorizer plumbing and the composed per-operation authorization check.

pub mod authorizer;
pub mod composer;

pub use authorizer::{authorizer_fn, AuthContext, AuthError, Authorizer, AuthorizerRegistry};
pub use composer::{build_check, SecurityCheck};
