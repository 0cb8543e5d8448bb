#![deny(missing_docs)]

//! # Spec Resolver
//!
//! Flattens a Swagger 2.0 document into a list of [`Operation`]s.
//!
//! Handles:
//! - Local `$ref` inlining (one `RefResolver` per call, so memoization never
//!   leaks between loads).
//! - Path-item parameters, overridden per operation by `(name, in)`.
//! - `consumes` / `produces` / `security` fallback to the document root.
//! - Vendor extensions of the path item and the operation.
//! - Load-time configuration errors (missing or duplicate `operationId`).

use crate::config::ContractOptions;
use crate::error::{ContractError, ContractResult};
use crate::schema::{build_group_schemas, build_response_schemas};
use crate::spec::document::{string_list, SpecDocument};
use crate::spec::operation::{
    join_paths, HttpMethod, Operation, ParamGroup, Parameter, ScopeMode, SecurityRequirement,
};
use crate::spec::refs::RefResolver;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// A local shim for the fields of a parameter object the resolver relies on.
/// Everything else stays in the raw JSON and is handed to the schema builder.
#[derive(Debug, Deserialize)]
struct ShimParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(default)]
    required: bool,
}

/// Resolves every operation of `document`.
pub fn resolve(
    document: &SpecDocument,
    options: &ContractOptions,
) -> ContractResult<Vec<Operation>> {
    let root = document.raw();
    let mut refs = RefResolver::new(root);
    let or_scope_schemes = or_scope_schemes(document, &options.or_scopes_extension);
    let mut seen_ids = HashSet::new();
    let mut operations = Vec::new();

    let Some(paths) = document.paths() else {
        info!(operations = 0, "API document has no paths");
        return Ok(operations);
    };

    for (path, raw_item) in paths.iter().filter(|(k, _)| !k.starts_with("x-")) {
        let item = refs.resolve(raw_item)?;
        let Some(item) = item.as_object() else {
            continue;
        };

        let shared_params = parse_parameters(path, item.get("parameters"))?;
        let path_extensions = extensions(item);

        for method in HttpMethod::ALL {
            let Some(op) = item.get(method.as_str()).and_then(Value::as_object) else {
                continue;
            };

            let id = op
                .get("operationId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ContractError::MissingOperationId {
                    method: method.to_string(),
                    path: path.clone(),
                })?
                .to_string();
            if !seen_ids.insert(id.clone()) {
                return Err(ContractError::DuplicateOperationId(id));
            }

            let own_params = parse_parameters(&id, op.get("parameters"))?;
            let parameters = merge_parameters(shared_params.clone(), own_params);

            let param_group_schemas =
                build_group_schemas(&id, &parameters, root, options.strict_body_parameters)?;
            let response_schemas = build_response_schemas(&id, op.get("responses"), root)?;

            let security = security_requirements(
                op.get("security").or_else(|| root.get("security")),
                &or_scope_schemes,
            );

            let mut operation_extensions = path_extensions.clone();
            operation_extensions.extend(extensions(op));

            let operation = Operation {
                full_path: join_paths(document.base_path(), path),
                id,
                method,
                path: path.clone(),
                parameters,
                security,
                param_group_schemas,
                response_schemas,
                consumes: inherited_list(op, document, "consumes"),
                produces: inherited_list(op, document, "produces"),
                tags: string_list(op.get("tags")),
                extensions: operation_extensions,
            };
            debug!(
                operation = %operation.id,
                method = %operation.method,
                path = %operation.full_path,
                parameters = operation.parameters.len(),
                "resolved operation"
            );
            operations.push(operation);
        }
    }

    let cyclic: Vec<&str> = refs.cyclic_refs().collect();
    if !cyclic.is_empty() {
        debug!(refs = ?cyclic, "self-referencing schemas left as references");
    }
    info!(operations = operations.len(), "API document resolved");
    Ok(operations)
}

fn parse_parameters(owner: &str, value: Option<&Value>) -> ContractResult<Vec<Parameter>> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|spec| {
            let shim: ShimParameter =
                serde_json::from_value(spec.clone()).map_err(|e| ContractError::InvalidParameter {
                    operation: owner.to_string(),
                    message: e.to_string(),
                })?;
            let location = shim
                .location
                .parse::<ParamGroup>()
                .map_err(|message| ContractError::InvalidParameter {
                    operation: owner.to_string(),
                    message,
                })?;
            Ok(Parameter {
                name: shim.name,
                location,
                required: shim.required,
                spec: spec.clone(),
            })
        })
        .collect()
}

/// Operation parameters replace path-item parameters with the same name and location.
fn merge_parameters(mut shared: Vec<Parameter>, own: Vec<Parameter>) -> Vec<Parameter> {
    for param in own {
        match shared
            .iter_mut()
            .find(|p| p.name == param.name && p.location == param.location)
        {
            Some(existing) => *existing = param,
            None => shared.push(param),
        }
    }
    shared
}

fn security_requirements(
    value: Option<&Value>,
    or_scope_schemes: &BTreeSet<String>,
) -> Vec<SecurityRequirement> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|entry| entry.iter())
        .filter(|(scheme_id, _)| !scheme_id.starts_with("x-"))
        .map(|(scheme_id, scopes)| SecurityRequirement {
            scheme_id: scheme_id.clone(),
            scopes: string_list(Some(scopes)),
            mode: if or_scope_schemes.contains(scheme_id) {
                ScopeMode::Any
            } else {
                ScopeMode::All
            },
        })
        .collect()
}

fn or_scope_schemes(document: &SpecDocument, extension: &str) -> BTreeSet<String> {
    document
        .security_definitions()
        .map(|defs| {
            defs.iter()
                .filter(|(_, scheme)| scheme.get(extension).and_then(Value::as_bool) == Some(true))
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// An operation-level list wins whenever the key is present, even when empty.
fn inherited_list(op: &Map<String, Value>, document: &SpecDocument, key: &str) -> Vec<String> {
    match op.get(key) {
        Some(value) => string_list(Some(value)),
        None => document.string_list(key),
    }
}

fn extensions(object: &Map<String, Value>) -> BTreeMap<String, Value> {
    object
        .iter()
        .filter(|(k, _)| k.starts_with("x-"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
