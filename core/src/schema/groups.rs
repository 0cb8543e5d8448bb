#![deny(missing_docs)]

//! # Parameter Group Schemas
//!
//! Partitions an operation's parameters by location and builds one JSON
//! Schema per non-empty location:
//!
//! - `header`, `path`, `query`, `formData`: a synthesized `object` schema whose
//!   `properties` are the parameter fragments and whose `required` list is
//!   hoisted out of the per-parameter `required` flags.
//! - `body`: the body parameter's own `schema`, used verbatim.

use crate::error::{ContractError, ContractResult};
use crate::schema::compiled::SchemaValidator;
use crate::spec::operation::{ParamGroup, Parameter};
use crate::spec::refs::attach_ref_targets;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Parameter keywords that describe the parameter itself rather than its value.
const PARAMETER_ONLY_KEYS: [&str; 3] = ["name", "in", "required"];

/// The schema for one parameter group of one operation.
#[derive(Debug, Clone)]
pub struct ParamGroupSchema {
    /// Which location this schema covers.
    pub group: ParamGroup,
    /// The schema as built (without attached reference targets).
    pub schema: Value,
    /// Required property names. For `body`, the body parameter's name when
    /// the body is required.
    pub required: Vec<String>,
    /// Name of the body parameter (`body` group only).
    pub body_parameter: Option<String>,
    validator: SchemaValidator,
}

impl ParamGroupSchema {
    /// Declared properties (empty for `body`).
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        match self.group {
            ParamGroup::Body => None,
            _ => self.schema.get("properties").and_then(Value::as_object),
        }
    }

    /// The schema fragment of one declared property.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties().and_then(|props| props.get(name))
    }

    /// Whether `name` is in the group's `required` list.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// The compiled validator.
    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }
}

/// Builds the group schemas for one operation. Groups without parameters are
/// omitted from the map.
///
/// Only the first body parameter is used. With `strict_body` set, a second
/// body parameter is a configuration error instead.
pub fn build_group_schemas(
    operation_id: &str,
    parameters: &[Parameter],
    root: &Value,
    strict_body: bool,
) -> ContractResult<BTreeMap<ParamGroup, ParamGroupSchema>> {
    let mut schemas = BTreeMap::new();
    for group in ParamGroup::ALL {
        let params: Vec<&Parameter> = parameters.iter().filter(|p| p.location == group).collect();
        if params.is_empty() {
            continue;
        }

        let built = match group {
            ParamGroup::Body => {
                if params.len() > 1 {
                    if strict_body {
                        return Err(ContractError::MultipleBodyParameters(
                            operation_id.to_string(),
                        ));
                    }
                    warn!(
                        operation = operation_id,
                        kept = %params[0].name,
                        ignored = params.len() - 1,
                        "extra body parameters ignored"
                    );
                }
                body_group_schema(params[0])
            }
            _ => object_group_schema(group, &params),
        };

        let (schema, required, body_parameter) = built;
        let validator = compile(operation_id, group.as_str(), &schema, root)?;
        schemas.insert(
            group,
            ParamGroupSchema {
                group,
                schema,
                required,
                body_parameter,
                validator,
            },
        );
    }
    Ok(schemas)
}

fn body_group_schema(param: &Parameter) -> (Value, Vec<String>, Option<String>) {
    let schema = param.schema().cloned().unwrap_or_else(|| json!({}));
    let required = if param.required {
        vec![param.name.clone()]
    } else {
        Vec::new()
    };
    (schema, required, Some(param.name.clone()))
}

fn object_group_schema(
    group: ParamGroup,
    params: &[&Parameter],
) -> (Value, Vec<String>, Option<String>) {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in params {
        let name = property_name(group, &param.name);
        if param.required && !required.contains(&name) {
            required.push(name.clone());
        }
        properties.insert(name, property_fragment(&param.spec));
    }
    (object_schema(properties, &required), required, None)
}

/// An object schema over `properties`. Draft 4 rejects an empty `required`
/// array, so the key is only written when something is required.
pub(crate) fn object_schema(properties: Map<String, Value>, required: &[String]) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// Header names are case-insensitive and compared in lower case.
pub(crate) fn property_name(group: ParamGroup, name: &str) -> String {
    if group.is_case_insensitive() {
        name.to_ascii_lowercase()
    } else {
        name.to_string()
    }
}

/// A parameter object minus its parameter-only keywords, with the
/// Swagger-only `file` type dropped.
pub(crate) fn property_fragment(spec: &Value) -> Value {
    let mut fragment = match spec {
        Value::Object(map) => map
            .iter()
            .filter(|(k, _)| !PARAMETER_ONLY_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Map<String, Value>>(),
        _ => Map::new(),
    };
    if fragment.get("type").and_then(Value::as_str) == Some("file") {
        fragment.remove("type");
    }
    Value::Object(fragment)
}

/// Compiles `schema` with any leftover reference targets attached.
pub(crate) fn compile(
    operation_id: &str,
    location: &str,
    schema: &Value,
    root: &Value,
) -> ContractResult<SchemaValidator> {
    let mut compiled = schema.clone();
    attach_ref_targets(&mut compiled, root);
    SchemaValidator::compile(compiled).map_err(|message| ContractError::InvalidSchema {
        operation: operation_id.to_string(),
        location: location.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn param(name: &str, location: ParamGroup, required: bool, spec: Value) -> Parameter {
        Parameter {
            name: name.into(),
            location,
            required,
            spec,
        }
    }

    #[test]
    fn test_groups_without_parameters_are_omitted() {
        let params = vec![param(
            "limit",
            ParamGroup::Query,
            false,
            json!({ "name": "limit", "in": "query", "type": "integer" }),
        )];
        let groups = build_group_schemas("op", &params, &json!({}), false).unwrap();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![ParamGroup::Query]);
    }

    #[test]
    fn test_optional_only_group_has_no_required_list() {
        let params = vec![param(
            "limit",
            ParamGroup::Query,
            false,
            json!({ "name": "limit", "in": "query", "type": "integer", "default": 20 }),
        )];
        let groups = build_group_schemas("listPets", &params, &json!({}), false).unwrap();
        let query = &groups[&ParamGroup::Query];

        assert!(query.required.is_empty());
        assert!(query.schema.get("required").is_none());
        assert!(query.validator().is_valid(&json!({})));
        assert!(!query.validator().is_valid(&json!({ "limit": "many" })));
    }

    #[test]
    fn test_required_is_hoisted() {
        let params = vec![
            param(
                "petId",
                ParamGroup::Path,
                true,
                json!({ "name": "petId", "in": "path", "required": true, "type": "string" }),
            ),
            param(
                "version",
                ParamGroup::Path,
                false,
                json!({ "name": "version", "in": "path", "type": "integer" }),
            ),
        ];
        let groups = build_group_schemas("op", &params, &json!({}), false).unwrap();
        let path = &groups[&ParamGroup::Path];

        assert_eq!(path.required, vec!["petId".to_string()]);
        assert_eq!(path.schema["required"], json!(["petId"]));
        assert_eq!(path.property("petId"), Some(&json!({ "type": "string" })));
        assert!(path.is_required("petId"));
        assert!(!path.is_required("version"));
    }

    #[test]
    fn test_body_schema_is_used_verbatim() {
        let body_schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        });
        let params = vec![param(
            "pet",
            ParamGroup::Body,
            true,
            json!({ "name": "pet", "in": "body", "required": true, "schema": body_schema.clone() }),
        )];
        let groups = build_group_schemas("op", &params, &json!({}), false).unwrap();
        let body = &groups[&ParamGroup::Body];

        assert_eq!(body.schema, body_schema);
        assert_eq!(body.required, vec!["pet".to_string()]);
        assert_eq!(body.body_parameter.as_deref(), Some("pet"));
        assert!(body.properties().is_none());
    }

    #[test]
    fn test_first_body_parameter_wins() {
        let params = vec![
            param(
                "first",
                ParamGroup::Body,
                false,
                json!({ "name": "first", "in": "body", "schema": { "type": "string" } }),
            ),
            param(
                "second",
                ParamGroup::Body,
                false,
                json!({ "name": "second", "in": "body", "schema": { "type": "integer" } }),
            ),
        ];
        let groups = build_group_schemas("op", &params, &json!({}), false).unwrap();
        assert_eq!(groups[&ParamGroup::Body].body_parameter.as_deref(), Some("first"));

        let err = build_group_schemas("op", &params, &json!({}), true).unwrap_err();
        assert!(matches!(err, ContractError::MultipleBodyParameters(id) if id == "op"));
    }

    #[test]
    fn test_header_names_are_lowercased() {
        let params = vec![param(
            "X-Request-Id",
            ParamGroup::Header,
            true,
            json!({ "name": "X-Request-Id", "in": "header", "required": true, "type": "string" }),
        )];
        let groups = build_group_schemas("op", &params, &json!({}), false).unwrap();
        let header = &groups[&ParamGroup::Header];
        assert_eq!(header.required, vec!["x-request-id".to_string()]);
        assert!(header.property("x-request-id").is_some());
    }

    #[test]
    fn test_file_type_is_dropped() {
        let fragment = property_fragment(&json!({
            "name": "upload", "in": "formData", "type": "file", "description": "a file"
        }));
        assert_eq!(fragment, json!({ "description": "a file" }));
    }

    #[test]
    fn test_cyclic_body_reference_compiles() {
        let root = json!({
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": { "next": { "$ref": "#/definitions/Node" } }
                }
            }
        });
        let params = vec![param(
            "node",
            ParamGroup::Body,
            true,
            json!({
                "name": "node", "in": "body", "required": true,
                "schema": {
                    "type": "object",
                    "properties": { "next": { "$ref": "#/definitions/Node" } }
                }
            }),
        )];
        let groups = build_group_schemas("op", &params, &root, false).unwrap();
        let validator = groups[&ParamGroup::Body].validator();
        assert!(validator.is_valid(&json!({ "next": { "next": {} } })));
        assert!(!validator.is_valid(&json!({ "next": { "next": 3 } })));
    }
}
