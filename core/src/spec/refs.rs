#![deny(missing_docs)]

//! # Reference Resolution
//!
//! Inlines local `$ref` pointers (`#/definitions/Pet`, `#/parameters/limit`)
//! into the fragments that use them.
//!
//! A `RefResolver` lives for exactly one document load. It memoizes every
//! target it has resolved and keeps the chain of references currently being
//! expanded, so a schema that refers back to itself is left as a `$ref` instead
//! of being expanded forever. Those leftover references are later made
//! resolvable by [`attach_ref_targets`].

use crate::error::{ContractError, ContractResult};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Keys whose values are instance data rather than schema and are never walked.
const OPAQUE_KEYS: [&str; 2] = ["example", "examples"];

/// Resolves local references against one document root.
pub struct RefResolver<'a> {
    root: &'a Value,
    resolved: HashMap<String, Value>,
    in_progress: Vec<String>,
    cyclic: BTreeSet<String>,
}

impl<'a> RefResolver<'a> {
    /// Creates a resolver scoped to `root`.
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
            cyclic: BTreeSet::new(),
        }
    }

    /// Follows a `#/a/b/c` pointer from the document root.
    pub fn lookup(&self, reference: &str) -> ContractResult<&'a Value> {
        let pointer = reference.strip_prefix('#').ok_or_else(|| {
            ContractError::General(format!(
                "Unsupported external schema reference: {}",
                reference
            ))
        })?;

        let mut value = self.root;
        for raw in pointer.split('/').skip(1) {
            let segment = decode_pointer_segment(raw);
            let next = match value {
                Value::Object(map) => map.get(&segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            value = next.ok_or_else(|| ContractError::BrokenReference {
                reference: reference.to_string(),
                segment: segment.clone(),
            })?;
        }
        Ok(value)
    }

    /// Returns a copy of `value` with every reachable `$ref` inlined.
    ///
    /// References that close a cycle stay in place and are recorded in
    /// [`RefResolver::cyclic_refs`].
    pub fn resolve(&mut self, value: &Value) -> ContractResult<Value> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.resolve_ref(reference, value);
                }
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, child) in map {
                    let resolved = if OPAQUE_KEYS.contains(&key.as_str()) || key.starts_with("x-") {
                        child.clone()
                    } else {
                        self.resolve(child)?
                    };
                    out.insert(key.clone(), resolved);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<ContractResult<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    /// References left unexpanded because they point back into their own chain.
    pub fn cyclic_refs(&self) -> impl Iterator<Item = &str> {
        self.cyclic.iter().map(String::as_str)
    }

    fn resolve_ref(&mut self, reference: &str, original: &Value) -> ContractResult<Value> {
        if self.in_progress.iter().any(|r| r == reference) {
            self.cyclic.insert(reference.to_string());
            return Ok(original.clone());
        }
        if let Some(done) = self.resolved.get(reference) {
            return Ok(done.clone());
        }

        let target = self.lookup(reference)?;
        self.in_progress.push(reference.to_string());
        let outcome = self.resolve(target);
        self.in_progress.pop();

        let resolved = outcome?;
        self.resolved.insert(reference.to_string(), resolved.clone());
        Ok(resolved)
    }
}

/// Copies the top-level document sections that leftover `$ref`s in `schema`
/// point into (usually `definitions`) onto the schema root, so a JSON Schema
/// validator can follow them relative to the schema itself.
pub fn attach_ref_targets(schema: &mut Value, root: &Value) {
    let mut attached = BTreeSet::new();
    loop {
        let mut sections = BTreeSet::new();
        collect_ref_sections(schema, &mut sections);
        let pending: Vec<String> = sections
            .into_iter()
            .filter(|s| !attached.contains(s))
            .collect();
        if pending.is_empty() {
            return;
        }

        let Some(target) = schema.as_object_mut() else {
            return;
        };
        for section in pending {
            if let Some(content) = root.get(&section) {
                target
                    .entry(section.clone())
                    .or_insert_with(|| content.clone());
            }
            attached.insert(section);
        }
    }
}

fn collect_ref_sections(value: &Value, sections: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if let Some(first) = reference
                    .strip_prefix("#/")
                    .and_then(|p| p.split('/').next())
                {
                    sections.insert(decode_pointer_segment(first));
                }
            }
            for (key, child) in map {
                if !OPAQUE_KEYS.contains(&key.as_str()) {
                    collect_ref_sections(child, sections);
                }
            }
        }
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_ref_sections(item, sections)),
        _ => {}
    }
}

/// Decodes a JSON Pointer segment (handles `~1`, `~0` and percent-encoding).
pub(crate) fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}
