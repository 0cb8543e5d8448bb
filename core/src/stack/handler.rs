//! # Handlers and Middleware
//!
//! The application-supplied pieces of a handler stack, and how they are
//! found for an operation. Handlers are resolved once when routes are
//! mounted, never per request.

use crate::spec::Operation;
use crate::stack::builder::{DispatchError, RequestContext};
use crate::validation::ResponseView;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The terminal step of a stack.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Produces the response.
    async fn handle(&self, context: &mut RequestContext) -> Result<ResponseView, DispatchError>;
}

/// Where a custom middleware runs relative to request validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiddlewarePhase {
    /// After authorization, before validation.
    #[default]
    PreValidation,
    /// After validation, before the handler.
    PostValidation,
}

/// A custom step between authorization and the handler.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// When the middleware runs.
    fn phase(&self) -> MiddlewarePhase {
        MiddlewarePhase::PreValidation
    }

    /// Inspects or augments the request. An error stops the stack.
    async fn handle(&self, context: &mut RequestContext) -> Result<(), DispatchError>;
}

/// Adapts a synchronous closure into a [`Handler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut RequestContext) -> Result<ResponseView, DispatchError> + Send + Sync,
{
    async fn handle(&self, context: &mut RequestContext) -> Result<ResponseView, DispatchError> {
        (self.0)(context)
    }
}

/// Wraps a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&mut RequestContext) -> Result<ResponseView, DispatchError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Adapts a synchronous closure into a [`Middleware`].
pub struct FnMiddleware<F> {
    phase: MiddlewarePhase,
    f: F,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut RequestContext) -> Result<(), DispatchError> + Send + Sync,
{
    fn phase(&self) -> MiddlewarePhase {
        self.phase
    }

    async fn handle(&self, context: &mut RequestContext) -> Result<(), DispatchError> {
        (self.f)(context)
    }
}

/// Wraps a closure as a shareable middleware running in `phase`.
pub fn middleware_fn<F>(phase: MiddlewarePhase, f: F) -> Arc<dyn Middleware>
where
    F: Fn(&mut RequestContext) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware { phase, f })
}

/// A handler plus the custom middleware it brings along.
#[derive(Clone)]
pub struct Registration {
    /// Terminal handler.
    pub handler: Arc<dyn Handler>,
    /// Custom middleware, in registration order.
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl Registration {
    /// A registration without middleware.
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            middleware: Vec::new(),
        }
    }

    /// Adds a middleware.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }
}

// Manual Debug implementation because trait objects do not implement Debug.
impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// Outcome of looking up the handler of an operation.
#[derive(Debug, Clone)]
pub enum HandlerResolution {
    /// Supplied by a registration.
    Registered(Registration),
    /// Nothing is registered; mounting fails.
    NotFound,
}

/// Finds the handler for an operation.
pub trait HandlerResolver {
    /// Looks up the handler for `operation`.
    fn resolve(&self, operation: &Operation) -> HandlerResolution;
}

impl<F> HandlerResolver for F
where
    F: Fn(&Operation) -> HandlerResolution,
{
    fn resolve(&self, operation: &Operation) -> HandlerResolution {
        self(operation)
    }
}

/// Registrations keyed by operation id.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    registrations: HashMap<String, Registration>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `operation_id`.
    pub fn register(&mut self, operation_id: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.register_with(operation_id, Registration::new(handler))
    }

    /// Registers a handler with its middleware.
    pub fn register_with(&mut self, operation_id: &str, registration: Registration) -> &mut Self {
        self.registrations
            .insert(operation_id.to_string(), registration);
        self
    }
}

impl HandlerResolver for HandlerRegistry {
    fn resolve(&self, operation: &Operation) -> HandlerResolution {
        match self.registrations.get(&operation.id) {
            Some(registration) => HandlerResolution::Registered(registration.clone()),
            None => HandlerResolution::NotFound,
        }
    }
}
