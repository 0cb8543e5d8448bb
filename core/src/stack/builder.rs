//! # Handler Stack
//!
//! The ordered steps an operation's route runs:
//!
//! 1. attach the resolved operation to the request context
//! 2. composed authorization, when the operation declares security
//! 3. pre-validation middleware
//! 4. request validation
//! 5. post-validation middleware
//! 6. the terminal handler

use crate::error::{ContractError, ContractResult};
use crate::security::{build_check, AuthError, AuthorizerRegistry, SecurityCheck};
use crate::spec::Operation;
use crate::stack::handler::{
    Handler, HandlerResolution, HandlerResolver, Middleware, MiddlewarePhase,
};
use crate::validation::{validate_request, RequestView, ResponseView, ValidationFailure};
use derive_more::{Display, From};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Why dispatching a request stopped before a response was produced.
#[derive(Debug, Display, From)]
pub enum DispatchError {
    /// The composed authorization check failed.
    #[display("{_0}")]
    Auth(AuthError),

    /// The request does not match the operation's parameters.
    #[display("{_0}")]
    Validation(ValidationFailure),

    /// A custom middleware stopped the request.
    #[from(ignore)]
    #[display("{message}")]
    Middleware {
        /// HTTP status to report.
        status: u16,
        /// Message to report.
        message: String,
    },

    /// The handler failed.
    #[from(ignore)]
    #[display("{message}")]
    Handler {
        /// HTTP status to report.
        status: u16,
        /// Message to report.
        message: String,
    },
}

impl DispatchError {
    /// HTTP status code of the failure.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::Auth(err) => err.status(),
            DispatchError::Validation(_) => 400,
            DispatchError::Middleware { status, .. } | DispatchError::Handler { status, .. } => {
                *status
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Per-request state threaded through the steps.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// The matched operation, once attached.
    pub operation: Option<Arc<Operation>>,
    /// The request. Validation coerces it in place.
    pub request: RequestView,
    /// Scratch space for middleware and handlers, dropped with the request.
    pub scratch: Map<String, Value>,
}

impl RequestContext {
    /// A fresh context for `request`.
    pub fn new(request: RequestView) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }
}

/// One step of a handler stack.
#[derive(Clone)]
pub enum Step {
    /// Attaches the operation to the request context.
    AttachOperation,
    /// Runs the composed authorization check.
    Authorize(SecurityCheck),
    /// Runs a custom middleware.
    Middleware(Arc<dyn Middleware>),
    /// Coerces and validates the request.
    Validate,
    /// Runs the terminal handler.
    Handle(Arc<dyn Handler>),
}

impl Step {
    /// Short name of the step.
    pub fn label(&self) -> &'static str {
        match self {
            Step::AttachOperation => "attach_operation",
            Step::Authorize(_) => "authorize",
            Step::Middleware(m) => match m.phase() {
                MiddlewarePhase::PreValidation => "pre_validation_middleware",
                MiddlewarePhase::PostValidation => "post_validation_middleware",
            },
            Step::Validate => "validate",
            Step::Handle(_) => "handle",
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The steps of one operation, ready to dispatch requests.
#[derive(Debug, Clone)]
pub struct HandlerStack {
    operation: Arc<Operation>,
    steps: Vec<Step>,
}

/// Assembles the stack for `operation`.
///
/// Fails when the resolver has no handler for the operation.
pub fn build_stack(
    operation: Arc<Operation>,
    resolver: &dyn HandlerResolver,
    authorizers: Arc<AuthorizerRegistry>,
) -> ContractResult<HandlerStack> {
    let registration = match resolver.resolve(&operation) {
        HandlerResolution::Registered(registration) => registration,
        HandlerResolution::NotFound => {
            return Err(ContractError::MissingHandler(operation.id.clone()))
        }
    };

    let mut steps = vec![Step::AttachOperation];
    if let Some(check) = build_check(&operation, authorizers) {
        steps.push(Step::Authorize(check));
    }
    let (pre, post): (Vec<_>, Vec<_>) = registration
        .middleware
        .into_iter()
        .partition(|m| m.phase() == MiddlewarePhase::PreValidation);
    steps.extend(pre.into_iter().map(Step::Middleware));
    steps.push(Step::Validate);
    steps.extend(post.into_iter().map(Step::Middleware));
    steps.push(Step::Handle(registration.handler));

    debug!(
        operation = %operation.id,
        steps = ?steps,
        "handler stack built"
    );
    Ok(HandlerStack { operation, steps })
}

impl HandlerStack {
    /// The operation this stack serves.
    pub fn operation(&self) -> &Arc<Operation> {
        &self.operation
    }

    /// The steps, in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Runs the steps over `request` and returns the handler's response.
    pub async fn dispatch(&self, request: RequestView) -> Result<ResponseView, DispatchError> {
        let mut context = RequestContext::new(request);
        for step in &self.steps {
            match step {
                Step::AttachOperation => context.operation = Some(self.operation.clone()),
                Step::Authorize(check) => {
                    check.authorize(Arc::new(context.request.clone())).await?;
                }
                Step::Middleware(middleware) => middleware.handle(&mut context).await?,
                Step::Validate => {
                    if let Some(failure) = validate_request(&mut context.request, &self.operation) {
                        return Err(DispatchError::Validation(failure));
                    }
                }
                Step::Handle(handler) => return handler.handle(&mut context).await,
            }
        }
        Err(DispatchError::Handler {
            status: 500,
            message: format!("No handler ran for '{}'", self.operation.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractOptions;
    use crate::security::authorizer_fn;
    use crate::spec::{resolve, SpecDocument};
    use crate::stack::handler::{handler_fn, middleware_fn, HandlerRegistry, Registration};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn operation(security: Value) -> Arc<Operation> {
        let doc = SpecDocument::from_value(json!({
            "securityDefinitions": {
                "apiKey": { "type": "apiKey", "name": "key", "in": "header" }
            },
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "operationId": "showPetById",
                        "security": security,
                        "parameters": [
                            { "name": "petId", "in": "path", "required": true, "type": "integer" }
                        ]
                    }
                }
            }
        }))
        .unwrap();
        Arc::new(
            resolve(&doc, &ContractOptions::default())
                .unwrap()
                .remove(0),
        )
    }

    fn secured() -> Value {
        json!([{ "apiKey": [] }])
    }

    fn echo_handler() -> Arc<dyn Handler> {
        handler_fn(|ctx: &mut RequestContext| {
            let trail = ctx.scratch.get("trail").cloned().unwrap_or(Value::Null);
            Ok(ResponseView::new(200).with_body(json!({
                "petId": ctx.request.path.get("petId").cloned(),
                "trail": trail,
                "attached": ctx.operation.as_ref().map(|op| op.id.clone()),
            })))
        })
    }

    fn tracing_middleware(phase: MiddlewarePhase, name: &'static str) -> Arc<dyn Middleware> {
        middleware_fn(phase, move |ctx: &mut RequestContext| {
            let trail = ctx
                .scratch
                .entry("trail")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = trail {
                // pre-validation middleware sees the raw string, post sees the integer
                items.push(json!({ name: ctx.request.path.get("petId").cloned() }));
            }
            Ok(())
        })
    }

    fn registry() -> Arc<AuthorizerRegistry> {
        Arc::new(AuthorizerRegistry::new().with(
            "apiKey",
            authorizer_fn(|ctx| async move {
                match ctx.request().header.get("key") {
                    Some(_) => Ok(()),
                    None => Err(AuthError::Unauthorized {
                        scheme: ctx.scheme_id().to_string(),
                    }),
                }
            }),
        ))
    }

    fn resolver() -> HandlerRegistry {
        let mut handlers = HandlerRegistry::new();
        handlers.register_with(
            "showPetById",
            Registration::new(echo_handler())
                .with_middleware(tracing_middleware(MiddlewarePhase::PostValidation, "post"))
                .with_middleware(tracing_middleware(MiddlewarePhase::PreValidation, "pre")),
        );
        handlers
    }

    #[test]
    fn test_step_order() {
        let stack = build_stack(operation(secured()), &resolver(), registry()).unwrap();
        let labels: Vec<&str> = stack.steps().iter().map(Step::label).collect();
        assert_eq!(
            labels,
            vec![
                "attach_operation",
                "authorize",
                "pre_validation_middleware",
                "validate",
                "post_validation_middleware",
                "handle",
            ]
        );
    }

    #[test]
    fn test_no_security_no_authorize_step() {
        let stack = build_stack(operation(json!([])), &resolver(), registry()).unwrap();
        assert!(stack.steps().iter().all(|s| s.label() != "authorize"));
    }

    #[test]
    fn test_missing_handler_is_a_load_error() {
        let err = build_stack(
            operation(json!([])),
            &HandlerRegistry::new(),
            registry(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing operation handler for 'showPetById'");
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |op: &Operation| {
            if op.id == "showPetById" {
                HandlerResolution::Registered(Registration::new(echo_handler()))
            } else {
                HandlerResolution::NotFound
            }
        };
        assert!(build_stack(operation(json!([])), &resolver, registry()).is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_runs_steps_in_order() {
        let stack = build_stack(operation(secured()), &resolver(), registry()).unwrap();
        let request = RequestView::default()
            .with_header("key", "secret")
            .with_path("petId", "5");

        let response = stack.dispatch(request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            json!({
                "petId": 5,
                "trail": [{ "pre": "5" }, { "post": 5 }],
                "attached": "showPetById"
            })
        );
    }

    #[tokio::test]
    async fn test_dispatch_stops_on_auth_failure() {
        let stack = build_stack(operation(secured()), &resolver(), registry()).unwrap();
        let err = stack
            .dispatch(RequestView::default().with_path("petId", "5"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 401);
    }

    #[tokio::test]
    async fn test_dispatch_stops_on_validation_failure() {
        let stack = build_stack(operation(json!([])), &resolver(), registry()).unwrap();
        let err = stack
            .dispatch(RequestView::default().with_path("petId", "abc"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(matches!(err, DispatchError::Validation(ref f) if f.mentions("path.petId")));
    }

    #[tokio::test]
    async fn test_middleware_error_stops_dispatch() {
        let mut handlers = HandlerRegistry::new();
        handlers.register_with(
            "showPetById",
            Registration::new(echo_handler()).with_middleware(middleware_fn(
                MiddlewarePhase::PreValidation,
                |_ctx: &mut RequestContext| {
                    Err(DispatchError::Middleware {
                        status: 429,
                        message: "Too many requests".into(),
                    })
                },
            )),
        );
        let stack = build_stack(operation(json!([])), &handlers, registry()).unwrap();
        let err = stack
            .dispatch(RequestView::default().with_path("petId", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 429);
        assert_eq!(err.to_string(), "Too many requests");
    }
}
