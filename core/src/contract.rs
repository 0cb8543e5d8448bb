#![deny(missing_docs)]

//! # API Contracts
//!
//! An `ApiContract` is everything derived from one document load: the
//! document itself, its operations with compiled schemas, and the docs route.
//! It is immutable and shared behind an `Arc`.
//!
//! `ContractStore` holds the current contract. Reloading builds a complete
//! new contract first and then swaps the pointer, so requests already
//! dispatched keep the snapshot they started with.

use crate::config::ContractOptions;
use crate::error::ContractResult;
use crate::security::{Authorizer, AuthorizerRegistry};
use crate::spec::operation::join_paths;
use crate::spec::{resolve, HttpMethod, Operation, SpecDocument};
use crate::stack::{build_stack, HandlerResolver, HandlerStack};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The contracts derived from one document load.
#[derive(Debug)]
pub struct ApiContract {
    document: SpecDocument,
    options: ContractOptions,
    operations: Vec<Arc<Operation>>,
    docs_route: String,
}

/// A route ready to be registered with an HTTP router.
#[derive(Debug, Clone)]
pub struct MountedRoute {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path in `:name` router syntax.
    pub pattern: String,
    /// The steps to run for matching requests.
    pub stack: HandlerStack,
}

impl ApiContract {
    /// Loads and resolves a document from disk.
    pub fn load(path: impl AsRef<Path>, options: ContractOptions) -> ContractResult<Self> {
        Self::from_document(SpecDocument::load(path)?, options)
    }

    /// Resolves an already loaded document.
    pub fn from_document(document: SpecDocument, options: ContractOptions) -> ContractResult<Self> {
        let operations = resolve(&document, &options)?
            .into_iter()
            .map(Arc::new)
            .collect();
        let docs_route = join_paths(document.base_path(), &options.docs_path);
        Ok(Self {
            document,
            options,
            operations,
            docs_route,
        })
    }

    /// The loaded document.
    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    /// The raw document as served on the docs route.
    pub fn docs_document(&self) -> &Value {
        self.document.raw()
    }

    /// Where the raw document is served (`basePath` + `docsPath`).
    pub fn docs_route(&self) -> &str {
        &self.docs_route
    }

    /// The options this contract was loaded with.
    pub fn options(&self) -> &ContractOptions {
        &self.options
    }

    /// All operations, in document order.
    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    /// Looks up an operation by id.
    pub fn operation(&self, id: &str) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Builds the authorizer registry for this document's security schemes.
    pub fn authorizers<F>(&self, factory: F) -> AuthorizerRegistry
    where
        F: FnMut(&str, &Value) -> Option<Arc<dyn Authorizer>>,
    {
        AuthorizerRegistry::from_definitions(self.document.security_definitions(), factory)
    }

    /// Builds a handler stack for every operation. Fails on the first
    /// operation without a handler.
    pub fn mount(
        &self,
        resolver: &dyn HandlerResolver,
        authorizers: Arc<AuthorizerRegistry>,
    ) -> ContractResult<Vec<MountedRoute>> {
        self.operations
            .iter()
            .map(|op| -> ContractResult<MountedRoute> {
                Ok(MountedRoute {
                    method: op.method,
                    pattern: op.route_pattern(),
                    stack: build_stack(op.clone(), resolver, authorizers.clone())?,
                })
            })
            .collect()
    }
}

/// Holds the current contract and swaps it atomically on reload.
#[derive(Debug)]
pub struct ContractStore {
    current: RwLock<Arc<ApiContract>>,
}

impl ContractStore {
    /// Starts with `contract` as the current snapshot.
    pub fn new(contract: ApiContract) -> Self {
        Self {
            current: RwLock::new(Arc::new(contract)),
        }
    }

    /// The current snapshot. It stays valid after later reloads.
    pub fn snapshot(&self) -> Arc<ApiContract> {
        self.current.read().clone()
    }

    /// Installs `contract`, returning the previous snapshot.
    pub fn replace(&self, contract: ApiContract) -> Arc<ApiContract> {
        self.install(Arc::new(contract))
    }

    /// Loads `path` with the current options and installs the result. On
    /// error the current contract is kept.
    ///
    /// Returns the contract this call installed, even if another reload has
    /// replaced it since.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> ContractResult<Arc<ApiContract>> {
        let options = self.snapshot().options().clone();
        let next = Arc::new(ApiContract::load(path, options)?);
        self.install(next.clone());
        Ok(next)
    }

    fn install(&self, next: Arc<ApiContract>) -> Arc<ApiContract> {
        let operations = next.operations().len();
        let previous = std::mem::replace(&mut *self.current.write(), next);
        info!(operations, "API contract replaced");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::stack::{handler_fn, HandlerRegistry, HandlerResolution};
    use crate::validation::ResponseView;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn contract(paths: Value) -> ApiContract {
        let doc = SpecDocument::from_value(json!({
            "swagger": "2.0",
            "basePath": "/v1",
            "paths": paths
        }))
        .unwrap();
        ApiContract::from_document(doc, ContractOptions::default()).unwrap()
    }

    #[test]
    fn test_docs_route_and_lookup() {
        let contract = contract(json!({ "/pets": { "get": { "operationId": "listPets" } } }));
        assert_eq!(contract.docs_route(), "/v1/api-docs");
        assert_eq!(contract.docs_document()["basePath"], "/v1");
        assert!(contract.operation("listPets").is_some());
        assert!(contract.operation("nope").is_none());
    }

    #[test]
    fn test_mount_builds_routes() {
        let contract = contract(json!({
            "/pets/{petId}": { "get": { "operationId": "showPetById" } }
        }));
        let resolver = |_: &Operation| {
            HandlerResolution::Registered(crate::stack::Registration::new(handler_fn(|_| {
                Ok(ResponseView::new(200))
            })))
        };
        let routes = contract
            .mount(&resolver, Arc::new(AuthorizerRegistry::new()))
            .unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, HttpMethod::Get);
        assert_eq!(routes[0].pattern, "/v1/pets/:petId");
    }

    #[test]
    fn test_mount_fails_without_handler() {
        let contract = contract(json!({ "/pets": { "get": { "operationId": "listPets" } } }));
        let err = contract
            .mount(&HandlerRegistry::new(), Arc::new(AuthorizerRegistry::new()))
            .unwrap_err();
        assert!(matches!(err, ContractError::MissingHandler(id) if id == "listPets"));
    }

    #[test]
    fn test_replace_keeps_old_snapshot() {
        let store = ContractStore::new(contract(
            json!({ "/a": { "get": { "operationId": "a" } } }),
        ));
        let before = store.snapshot();

        let previous = store.replace(contract(json!({
            "/a": { "get": { "operationId": "a" } },
            "/b": { "get": { "operationId": "b" } }
        })));

        assert_eq!(before.operations().len(), 1);
        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(store.snapshot().operations().len(), 2);
    }

    #[test]
    fn test_reload_returns_the_installed_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        std::fs::write(
            &path,
            json!({ "paths": { "/a": { "get": { "operationId": "a" } } } }).to_string(),
        )
        .unwrap();

        let store = ContractStore::new(contract(json!({})));
        let loaded = store.reload_from(&path).unwrap();
        assert!(Arc::ptr_eq(&loaded, &store.snapshot()));

        store.replace(contract(json!({})));
        assert_eq!(loaded.operations().len(), 1);
        assert!(!Arc::ptr_eq(&loaded, &store.snapshot()));
    }
}
