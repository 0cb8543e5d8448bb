//! # Authorizers
//!
//! The pluggable side of authorization: the `Authorizer` trait, the context
//! it receives, and the registry that maps security scheme ids to authorizers.

use crate::spec::{ScopeMode, SecurityRequirement};
use crate::validation::RequestView;
use async_trait::async_trait;
use derive_more::Display;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Why a request was not authorized.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AuthError {
    /// No authorizer could evaluate the scheme, or it refused the caller.
    #[display("Unauthorized")]
    Unauthorized {
        /// Security scheme id.
        scheme: String,
    },

    /// The caller lacks required scopes.
    #[display("Forbidden")]
    Forbidden {
        /// Security scheme id.
        scheme: String,
        /// Required scopes the caller does not hold.
        missing_scopes: Vec<String>,
    },

    /// An authorizer rejected the request with its own status.
    #[display("{message}")]
    Rejected {
        /// HTTP status to report.
        status: u16,
        /// Message to report.
        message: String,
    },

    /// The authorizer task panicked or was aborted.
    #[display("Authorizer interrupted: {_0}")]
    Interrupted(String),
}

impl AuthError {
    /// HTTP status code of the condition.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Unauthorized { .. } => 401,
            AuthError::Forbidden { .. } => 403,
            AuthError::Rejected { status, .. } => *status,
            AuthError::Interrupted(_) => 500,
        }
    }
}

impl std::error::Error for AuthError {}

/// What an authorizer sees for one security requirement.
#[derive(Debug, Clone)]
pub struct AuthContext {
    request: Arc<RequestView>,
    scheme_id: String,
    required_scopes: Vec<String>,
    mode: ScopeMode,
    cancellation: CancellationToken,
}

impl AuthContext {
    /// Binds a request to one security requirement.
    pub fn new(
        request: Arc<RequestView>,
        requirement: &SecurityRequirement,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            request,
            scheme_id: requirement.scheme_id.clone(),
            required_scopes: requirement.scopes.clone(),
            mode: requirement.mode,
            cancellation,
        }
    }

    /// The inbound request.
    pub fn request(&self) -> &RequestView {
        &self.request
    }

    /// The security scheme being evaluated.
    pub fn scheme_id(&self) -> &str {
        &self.scheme_id
    }

    /// Scopes the requirement asks for.
    pub fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }

    /// Cancelled as soon as a sibling requirement fails.
    ///
    /// Authorizers are never aborted; checking this is how they can stop
    /// early.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Checks `granted` against the required scopes.
    ///
    /// In `All` mode every required scope must be granted; in `Any` mode one
    /// is enough. An empty requirement always passes.
    pub fn verify_scopes<S: AsRef<str>>(&self, granted: &[S]) -> Result<(), AuthError> {
        if self.required_scopes.is_empty() {
            return Ok(());
        }
        let held = |scope: &String| granted.iter().any(|g| g.as_ref() == scope);

        let satisfied = match self.mode {
            ScopeMode::All => self.required_scopes.iter().all(held),
            ScopeMode::Any => self.required_scopes.iter().any(held),
        };
        if satisfied {
            return Ok(());
        }
        Err(AuthError::Forbidden {
            scheme: self.scheme_id.clone(),
            missing_scopes: self
                .required_scopes
                .iter()
                .filter(|s| !held(*s))
                .cloned()
                .collect(),
        })
    }
}

/// Decides whether a request satisfies one security scheme.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Resolves to `Ok(())` when the request is authorized.
    async fn authorize(&self, context: AuthContext) -> Result<(), AuthError>;
}

/// Adapts an async closure into an [`Authorizer`].
pub struct FnAuthorizer<F>(F);

#[async_trait]
impl<F, Fut> Authorizer for FnAuthorizer<F>
where
    F: Fn(AuthContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), AuthError>> + Send,
{
    async fn authorize(&self, context: AuthContext) -> Result<(), AuthError> {
        (self.0)(context).await
    }
}

/// Wraps an async closure as a shareable authorizer.
pub fn authorizer_fn<F, Fut>(f: F) -> Arc<dyn Authorizer>
where
    F: Fn(AuthContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AuthError>> + Send + 'static,
{
    Arc::new(FnAuthorizer(f))
}

/// Security scheme id to authorizer, built once per document load.
#[derive(Clone, Default)]
pub struct AuthorizerRegistry {
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
}

// Manual Debug implementation because trait objects do not implement Debug.
impl fmt::Debug for AuthorizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.authorizers.keys().collect();
        ids.sort();
        f.debug_struct("AuthorizerRegistry")
            .field("schemes", &ids)
            .finish()
    }
}

impl AuthorizerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry by asking `factory` for an authorizer for every
    /// scheme in `securityDefinitions` (vendor extension keys are skipped).
    /// Schemes the factory declines stay unregistered and will fail closed.
    pub fn from_definitions<F>(definitions: Option<&Map<String, Value>>, mut factory: F) -> Self
    where
        F: FnMut(&str, &Value) -> Option<Arc<dyn Authorizer>>,
    {
        let mut registry = Self::new();
        let Some(definitions) = definitions else {
            return registry;
        };
        for (id, scheme) in definitions.iter().filter(|(k, _)| !k.starts_with("x-")) {
            match factory(id, scheme) {
                Some(authorizer) => {
                    debug!(scheme = %id, "authorizer registered");
                    registry.insert(id, authorizer);
                }
                None => warn!(scheme = %id, "no authorizer for security scheme"),
            }
        }
        registry
    }

    /// Registers (or replaces) the authorizer for `scheme_id`.
    pub fn insert(&mut self, scheme_id: &str, authorizer: Arc<dyn Authorizer>) -> &mut Self {
        self.authorizers.insert(scheme_id.to_string(), authorizer);
        self
    }

    /// Builder form of [`AuthorizerRegistry::insert`].
    pub fn with(mut self, scheme_id: &str, authorizer: Arc<dyn Authorizer>) -> Self {
        self.insert(scheme_id, authorizer);
        self
    }

    /// The authorizer for `scheme_id`.
    pub fn get(&self, scheme_id: &str) -> Option<&Arc<dyn Authorizer>> {
        self.authorizers.get(scheme_id)
    }

    /// Whether `scheme_id` has an authorizer.
    pub fn contains(&self, scheme_id: &str) -> bool {
        self.authorizers.contains_key(scheme_id)
    }

    /// Number of registered schemes.
    pub fn len(&self) -> usize {
        self.authorizers.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.authorizers.is_empty()
    }
}
