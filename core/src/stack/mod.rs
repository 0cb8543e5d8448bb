#![deny(missing_docs)]

//! # Stack Module
//!
//! Per-operation handler stacks: the fixed step order, the traits
//! applications implement, and request dispatch.

pub mod builder;
pub mod handler;

pub use builder::{build_stack, DispatchError, HandlerStack, RequestContext, Step};
pub use handler::{
    handler_fn, middleware_fn, Handler, HandlerRegistry, HandlerResolution, HandlerResolver,
    Middleware, MiddlewarePhase, Registration,
};
