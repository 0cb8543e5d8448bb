#![deny(missing_docs)]

//! # Operation Models
//!
//! Immutable records produced by the resolver: one `Operation` per
//! path/verb pair, with its parameters, security requirements and the
//! compiled group and response schemas.

use crate::schema::{ParamGroupSchema, ResponseSchema};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// The HTTP verbs a path item may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    /// `get`
    Get,
    /// `put`
    Put,
    /// `post`
    Post,
    /// `delete`
    Delete,
    /// `options`
    Options,
    /// `head`
    Head,
    /// `patch`
    Patch,
}

impl HttpMethod {
    /// All verbs, in document key order.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
    ];

    /// Lower-case key used in path items.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown HTTP method '{}'", s))
    }
}

/// The five request locations a parameter can live in.
///
/// Each variant's special cases are expressed as methods so that every
/// per-group rule is an exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamGroup {
    /// Request headers.
    Header,
    /// Templated path segments.
    Path,
    /// Query string.
    Query,
    /// The request payload.
    Body,
    /// Form fields and uploaded files.
    FormData,
}

impl ParamGroup {
    /// All groups, in validation order.
    pub const ALL: [ParamGroup; 5] = [
        ParamGroup::Header,
        ParamGroup::Path,
        ParamGroup::Query,
        ParamGroup::Body,
        ParamGroup::FormData,
    ];

    /// Value of the parameter's `in` keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamGroup::Header => "header",
            ParamGroup::Path => "path",
            ParamGroup::Query => "query",
            ParamGroup::Body => "body",
            ParamGroup::FormData => "formData",
        }
    }

    /// Whether wire strings are coerced before validation.
    pub fn is_coerced(&self) -> bool {
        match self {
            ParamGroup::Header | ParamGroup::Path | ParamGroup::Query | ParamGroup::FormData => {
                true
            }
            ParamGroup::Body => false,
        }
    }

    /// Whether `allowEmptyValue` may suppress errors for this group.
    pub fn honors_allow_empty_value(&self) -> bool {
        match self {
            ParamGroup::Query | ParamGroup::FormData => true,
            ParamGroup::Header | ParamGroup::Path | ParamGroup::Body => false,
        }
    }

    /// Whether undeclared keys are reported as errors.
    pub fn rejects_unknown_keys(&self) -> bool {
        match self {
            ParamGroup::Path => true,
            ParamGroup::Header | ParamGroup::Query | ParamGroup::Body | ParamGroup::FormData => {
                false
            }
        }
    }

    /// Whether keys are compared case-insensitively.
    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, ParamGroup::Header)
    }

    /// Whether an empty string is the same as no value at all.
    pub fn treats_empty_as_absent(&self) -> bool {
        matches!(self, ParamGroup::Path)
    }
}

impl fmt::Display for ParamGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unsupported parameter location '{}'", s))
    }
}

/// How an array parameter is serialized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFormat {
    /// Comma separated (`a,b,c`).
    #[default]
    Csv,
    /// Space separated.
    Ssv,
    /// Tab separated.
    Tsv,
    /// Pipe separated.
    Pipes,
    /// One wire value per occurrence (`a=1&a=2`).
    Multi,
}

impl CollectionFormat {
    /// Delimiter for string-joined formats; `None` for `multi`.
    pub fn delimiter(&self) -> Option<char> {
        match self {
            CollectionFormat::Csv => Some(','),
            CollectionFormat::Ssv => Some(' '),
            CollectionFormat::Tsv => Some('\t'),
            CollectionFormat::Pipes => Some('|'),
            CollectionFormat::Multi => None,
        }
    }

    /// Reads the `collectionFormat` keyword, falling back to `csv` for
    /// missing or unknown values.
    pub fn from_keyword(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str).map(str::to_ascii_lowercase).as_deref() {
            Some("ssv") => CollectionFormat::Ssv,
            Some("tsv") => CollectionFormat::Tsv,
            Some("pipes") => CollectionFormat::Pipes,
            Some("multi") => CollectionFormat::Multi,
            _ => CollectionFormat::Csv,
        }
    }
}

/// A single resolved parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Location (`in`).
    pub location: ParamGroup,
    /// Whether the client must supply it.
    pub required: bool,
    /// The parameter object with every `$ref` inlined. For `body` parameters
    /// this is the whole parameter; its payload schema is [`Parameter::schema`].
    pub spec: Value,
}

impl Parameter {
    /// The payload schema of a body parameter.
    pub fn schema(&self) -> Option<&Value> {
        self.spec.get("schema")
    }

    /// Declared default value.
    pub fn default_value(&self) -> Option<&Value> {
        self.spec.get("default")
    }

    /// Declared `collectionFormat` (csv when absent).
    pub fn collection_format(&self) -> CollectionFormat {
        CollectionFormat::from_keyword(self.spec.get("collectionFormat"))
    }

    /// Whether `allowEmptyValue` is set.
    pub fn allow_empty_value(&self) -> bool {
        self.spec
            .get("allowEmptyValue")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Scope matching rule of a security scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// Every required scope must be granted.
    #[default]
    All,
    /// Any one required scope is enough.
    Any,
}

/// One AND-ed entry of an operation's security list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    /// Security scheme id (key of `securityDefinitions`).
    pub scheme_id: String,
    /// Scopes the caller must hold.
    pub scopes: Vec<String>,
    /// How `scopes` are matched.
    pub mode: ScopeMode,
}

/// One HTTP method/path pairing with its resolved contract.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Unique `operationId`.
    pub id: String,
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path template as written (`/pets/{petId}`).
    pub path: String,
    /// Path prefixed with the document's `basePath`.
    pub full_path: String,
    /// Resolved parameters, path-item parameters first.
    pub parameters: Vec<Parameter>,
    /// Security entries; all must pass.
    pub security: Vec<SecurityRequirement>,
    /// Compiled schema per non-empty parameter group.
    pub param_group_schemas: BTreeMap<ParamGroup, ParamGroupSchema>,
    /// Response schemas keyed by status code (or `default`).
    pub response_schemas: IndexMap<String, ResponseSchema>,
    /// Accepted request content types.
    pub consumes: Vec<String>,
    /// Produced response content types.
    pub produces: Vec<String>,
    /// Tags for grouping.
    pub tags: Vec<String>,
    /// `x-` extensions of the path item and the operation.
    pub extensions: BTreeMap<String, Value>,
}

impl Operation {
    /// The schema of one parameter group, if the group has any parameters.
    pub fn group_schema(&self, group: ParamGroup) -> Option<&ParamGroupSchema> {
        self.param_group_schemas.get(&group)
    }

    /// The full path in `:name` router syntax (`/v1/pets/:petId`).
    pub fn route_pattern(&self) -> String {
        to_route_pattern(&self.full_path)
    }
}

/// Joins a base path and a path template, collapsing repeated slashes.
pub fn join_paths(base: &str, path: &str) -> String {
    static SLASHES: OnceLock<Regex> = OnceLock::new();
    let re = SLASHES.get_or_init(|| Regex::new(r"/{2,}").expect("Invalid regex"));
    re.replace_all(&format!("/{}/{}", base, path), "/")
        .into_owned()
}

/// Converts `{name}` placeholders into `:name` segments.
pub fn to_route_pattern(template: &str) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^}]+)}").expect("Invalid regex"));
    re.replace_all(template, ":$1").into_owned()
}
