//! # Canonicalization
//!
//! The sorted, byte-comparable rendering of a token payload that anchors
//! every equality decision in the engine: diff snapshots, idempotent remote
//! writes, and round-trip checks.
//!
//! Canonical form: object keys recursively sorted (arrays keep order), and
//! at the document root only, the volatile export timestamp removed.

use crate::parser;
use crate::primitives::VOLATILE_EXPORT_FIELD;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Recursively sort object keys. Arrays keep their order; scalars pass
/// through.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(object) => {
            let mut sorted: Vec<(&String, &Value)> = object.iter().collect();
            sorted.sort_by(|left, right| left.0.cmp(right.0));
            let mut out = Map::new();
            for (key, child) in sorted {
                out.insert(key.clone(), canonicalize(child));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Remove the volatile export timestamp from the payload root.
#[must_use]
pub fn strip_volatile(payload: &Value) -> Value {
    let mut stripped = payload.clone();
    if let Some(object) = stripped.as_object_mut() {
        object.remove(VOLATILE_EXPORT_FIELD);
    }
    stripped
}

/// Deterministic compact serialization of the canonical form.
#[must_use]
pub fn stable_serialize(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Two trees are equal iff their canonical serializations are byte-identical.
#[must_use]
pub fn trees_equal(left: &Value, right: &Value) -> bool {
    stable_serialize(left) == stable_serialize(right)
}

/// Equality for remote text content.
///
/// When both sides parse as JSON, compare canonical forms with the volatile
/// timestamp stripped; otherwise fall back to trimmed text comparison.
#[must_use]
pub fn content_equal(left: &str, right: &str) -> bool {
    let parsed_left = serde_json::from_str::<Value>(left);
    let parsed_right = serde_json::from_str::<Value>(right);
    match (parsed_left, parsed_right) {
        (Ok(a), Ok(b)) => trees_equal(&strip_volatile(&a), &strip_volatile(&b)),
        _ => left.trim() == right.trim(),
    }
}

/// One token's identity in a diff snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// The trimmed raw type tag, or `unknown` when absent.
    pub type_tag: String,
    /// Stable serialization of the token's literal value.
    pub value_serialized: String,
}

/// Flatten a payload into a map from token path to snapshot entry.
///
/// Unparseable payloads yield an empty map; diffing treats them as having no
/// tokens rather than failing.
#[must_use]
pub fn snapshot(payload: &Value) -> BTreeMap<String, SnapshotEntry> {
    let mut map = BTreeMap::new();
    let Ok(tokens) = parser::parse_tokens(payload) else {
        return map;
    };
    for token in tokens {
        let type_tag = match token.raw_type.as_deref().map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
            _ => "unknown".to_string(),
        };
        map.insert(
            token.name,
            SnapshotEntry {
                type_tag,
                value_serialized: stable_serialize(&token.value),
            },
        );
    }
    map
}

// =============================================================================
// TESTS
// =============================================================================
