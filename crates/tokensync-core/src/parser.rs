//! # Token Tree Parser
//!
//! Walks an arbitrary JSON object tree and extracts a flat list of typed
//! leaf tokens with their accumulated paths.
//!
//! Pure functions, no side effects, deterministic given input. Map iteration
//! follows document order because the crate enables `preserve_order`.

use crate::types::{Token, TokenSyncError};
use serde_json::{Map, Value};

/// Keys skipped during tree descent: reserved metadata keys and any
/// `$`-prefixed key.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with('$') || crate::primitives::RESERVED_LEAF_KEYS.contains(&key)
}

fn is_token_leaf(node: &Map<String, Value>) -> bool {
    node.contains_key("$value") || node.contains_key("value")
}

/// Pull the leaf value and optional type hint out of a leaf node.
///
/// The `$`-prefixed spelling wins over the bare one for both keys.
fn extract_leaf(node: &Map<String, Value>) -> (Option<String>, Value) {
    let raw_type = node
        .get("$type")
        .and_then(Value::as_str)
        .or_else(|| node.get("type").and_then(Value::as_str))
        .map(ToString::to_string);
    let value = node
        .get("$value")
        .or_else(|| node.get("value"))
        .cloned()
        .unwrap_or(Value::Null);
    (raw_type, value)
}

fn collect_tokens(node: &Value, path: &[String], out: &mut Vec<Token>) {
    let Some(object) = node.as_object() else {
        return;
    };

    if is_token_leaf(object) && !path.is_empty() {
        let (raw_type, value) = extract_leaf(object);
        out.push(Token::new(path.to_vec(), raw_type, value));
    }

    // A leaf can still hold nested groups under non-reserved keys.
    for (key, child) in object {
        if is_reserved_key(key) {
            continue;
        }
        let mut child_path = path.to_vec();
        child_path.push(key.clone());
        collect_tokens(child, &child_path, out);
    }
}

/// Parse a token payload into its flat leaf list.
///
/// The root must be a JSON object. If it carries an object-valued `tokens`
/// field, descent starts there; otherwise the root itself is the token root.
pub fn parse_tokens(payload: &Value) -> Result<Vec<Token>, TokenSyncError> {
    let Some(root) = payload.as_object() else {
        return Err(TokenSyncError::InvalidPayload(
            "expected a JSON object".to_string(),
        ));
    };

    let tokens_root = match root.get("tokens") {
        Some(wrapped) if wrapped.is_object() => wrapped,
        _ => payload,
    };

    let mut out = Vec::new();
    collect_tokens(tokens_root, &[], &mut out);
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================
