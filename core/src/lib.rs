#![deny(missing_docs)]

//! # Contract Core
//!
//! Turns a Swagger 2.0 document into runtime contracts: resolved operations,
//! per-location parameter schemas, request coercion and validation, response
//! checking, composed authorization and ordered handler stacks.
//!
//! The HTTP layer is left to the host: it builds a `RequestView` from its own
//! request type and registers each `MountedRoute`.

/// Shared error types.
pub mod error;

/// Load-time options.
pub mod config;

/// Document loading, `$ref` resolution and operation models.
pub mod spec;

/// Parameter group and response schemas.
pub mod schema;

/// Coercion, request validation and response validation.
pub mod validation;

/// Authorizers and composed security checks.
pub mod security;

/// Handler stacks and dispatch.
pub mod stack;

/// Loaded contracts and atomic reload.
pub mod contract;

pub use config::ContractOptions;
pub use contract::{ApiContract, ContractStore, MountedRoute};
pub use error::{ContractError, ContractResult};
pub use schema::{build_group_schemas, ParamGroupSchema, ResponseSchema, SchemaValidator};
pub use security::{
    authorizer_fn, build_check, AuthContext, AuthError, Authorizer, AuthorizerRegistry,
    SecurityCheck,
};
pub use spec::{
    resolve, HttpMethod, Operation, ParamGroup, Parameter, ScopeMode, SecurityRequirement,
    SpecDocument,
};
pub use stack::{
    build_stack, handler_fn, middleware_fn, DispatchError, Handler, HandlerRegistry,
    HandlerResolution, HandlerResolver, HandlerStack, Middleware, MiddlewarePhase, Registration,
    RequestContext, Step,
};
pub use validation::{
    validate_request, validate_response, RequestView, ResponseError, ResponseView,
    ValidationFailure, ValidationIssue,
};
