//! # Composed Authorization
//!
//! Turns an operation's security list into one asynchronous gate. Every
//! entry must pass (AND across schemes); scope matching within an entry
//! follows the scheme's `ScopeMode`.
//!
//! Entries run concurrently as separate tasks. The first failure rejects the
//! gate and cancels the shared token; tasks already running are left to
//! finish so their side effects still happen.

use crate::security::authorizer::{AuthContext, AuthError, AuthorizerRegistry};
use crate::spec::{Operation, SecurityRequirement};
use crate::validation::RequestView;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The composed authorization check of one operation.
#[derive(Debug, Clone)]
pub struct SecurityCheck {
    operation_id: String,
    requirements: Vec<SecurityRequirement>,
    registry: Arc<AuthorizerRegistry>,
}

/// Builds the check for `operation`, or `None` when it declares no security.
pub fn build_check(
    operation: &Operation,
    registry: Arc<AuthorizerRegistry>,
) -> Option<SecurityCheck> {
    if operation.security.is_empty() {
        return None;
    }
    Some(SecurityCheck {
        operation_id: operation.id.clone(),
        requirements: operation.security.clone(),
        registry,
    })
}

impl SecurityCheck {
    /// The AND-ed requirements.
    pub fn requirements(&self) -> &[SecurityRequirement] {
        &self.requirements
    }

    /// Runs every requirement's authorizer. Resolves once all pass, or with
    /// the first failure observed.
    ///
    /// A scheme without an authorizer fails the check with 401 before any
    /// authorizer is started.
    pub async fn authorize(&self, request: Arc<RequestView>) -> Result<(), AuthError> {
        if let Some(missing) = self
            .requirements
            .iter()
            .find(|r| !self.registry.contains(&r.scheme_id))
        {
            warn!(
                operation = %self.operation_id,
                scheme = %missing.scheme_id,
                "no authorizer registered for security scheme"
            );
            return Err(AuthError::Unauthorized {
                scheme: missing.scheme_id.clone(),
            });
        }

        let cancellation = CancellationToken::new();
        let mut pending = FuturesUnordered::new();
        for requirement in &self.requirements {
            let Some(authorizer) = self.registry.get(&requirement.scheme_id).cloned() else {
                continue;
            };
            let context = AuthContext::new(request.clone(), requirement, cancellation.clone());
            pending.push(tokio::spawn(
                async move { authorizer.authorize(context).await },
            ));
        }

        while let Some(joined) = pending.next().await {
            let outcome = joined.unwrap_or_else(|e| Err(AuthError::Interrupted(e.to_string())));
            if let Err(err) = outcome {
                cancellation.cancel();
                debug!(
                    operation = %self.operation_id,
                    status = err.status(),
                    error = %err,
                    "authorization failed"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractOptions;
    use crate::security::authorizer::authorizer_fn;
    use crate::spec::{resolve, SpecDocument};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn operation(security: serde_json::Value) -> Operation {
        let doc = SpecDocument::from_value(json!({
            "securityDefinitions": {
                "apiKey": { "type": "apiKey", "name": "key", "in": "header" },
                "oauth": { "type": "oauth2", "flow": "implicit", "authorizationUrl": "http://x" },
                "roles": {
                    "type": "oauth2", "flow": "implicit", "authorizationUrl": "http://x",
                    "x-or-scopes": true
                }
            },
            "paths": { "/a": { "get": { "operationId": "a", "security": security } } }
        }))
        .unwrap();
        resolve(&doc, &ContractOptions::default())
            .unwrap()
            .remove(0)
    }

    fn check_for(security: serde_json::Value, registry: Arc<AuthorizerRegistry>) -> SecurityCheck {
        build_check(&operation(security), registry).unwrap()
    }

    fn granting(scopes: &'static [&'static str]) -> Arc<dyn crate::security::Authorizer> {
        authorizer_fn(move |ctx: AuthContext| async move { ctx.verify_scopes(scopes) })
    }

    fn registry() -> Arc<AuthorizerRegistry> {
        Arc::new(
            AuthorizerRegistry::new()
                .with("apiKey", granting(&[]))
                .with("oauth", granting(&["a"]))
                .with("roles", granting(&["a"])),
        )
    }

    fn request() -> Arc<RequestView> {
        Arc::new(RequestView::default())
    }

    #[test]
    fn test_no_security_means_no_check() {
        assert!(build_check(&operation(json!([])), registry()).is_none());
    }

    #[tokio::test]
    async fn test_all_schemes_pass() {
        let check = check_for(json!([{ "apiKey": [] }, { "oauth": ["a"] }]), registry());
        assert_eq!(check.requirements().len(), 2);
        assert!(check.authorize(request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_one_denying_scheme_rejects() {
        let registry = Arc::new(
            AuthorizerRegistry::new()
                .with("apiKey", granting(&[]))
                .with(
                    "oauth",
                    authorizer_fn(|ctx: AuthContext| async move {
                        Err(AuthError::Unauthorized {
                            scheme: ctx.scheme_id().to_string(),
                        })
                    }),
                ),
        );
        let check = check_for(json!([{ "apiKey": [] }, { "oauth": [] }]), registry);
        let err = check.authorize(request()).await.unwrap_err();
        assert_eq!(err.status(), 401);
    }

    #[tokio::test]
    async fn test_scope_modes() {
        let and_check = check_for(json!([{ "oauth": ["a", "b"] }]), registry());
        let err = and_check.authorize(request()).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::Forbidden {
                scheme: "oauth".into(),
                missing_scopes: vec!["b".into()],
            }
        );

        let or_check = check_for(json!([{ "roles": ["a", "b"] }]), registry());
        assert!(or_check.authorize(request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_authorizer_fails_closed() {
        let registry = Arc::new(AuthorizerRegistry::new().with("apiKey", granting(&[])));
        let check = check_for(json!([{ "apiKey": [] }, { "oauth": [] }]), registry);
        assert_eq!(
            check.authorize(request()).await.unwrap_err(),
            AuthError::Unauthorized {
                scheme: "oauth".into()
            }
        );
    }

    #[tokio::test]
    async fn test_sibling_authorizers_finish_after_rejection() {
        let finished = Arc::new(AtomicBool::new(false));
        let saw_cancel = Arc::new(AtomicBool::new(false));
        let (finished_flag, cancel_flag) = (finished.clone(), saw_cancel.clone());

        let slow = authorizer_fn(move |ctx: AuthContext| {
            let finished = finished_flag.clone();
            let saw_cancel = cancel_flag.clone();
            async move {
                ctx.cancellation().cancelled().await;
                saw_cancel.store(true, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                finished.store(true, Ordering::SeqCst);
                Ok(())
            }
        });
        let registry = Arc::new(
            AuthorizerRegistry::new()
                .with("apiKey", slow)
                .with("oauth", granting(&[])),
        );
        let check = check_for(json!([{ "apiKey": [] }, { "oauth": ["z"] }]), registry);

        let err = check.authorize(request()).await.unwrap_err();
        assert_eq!(err.status(), 403);

        for _ in 0..100 {
            if finished.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(saw_cancel.load(Ordering::SeqCst));
        assert!(finished.load(Ordering::SeqCst));
    }
}
