//! # Exporter
//!
//! Walks the store's current contents and serializes them back into the
//! canonical nested token tree, including alias round-tripping.
//!
//! Output is deterministic regardless of store iteration order: variables
//! are sorted by `(collection name, variable name)` before serialization.

use crate::infer;
use crate::primitives::{EXPORT_FORMAT, EXPORT_SOURCE, SCHEMA_VERSION};
use crate::store::VariableStore;
use crate::types::{Collection, ModeId, TokenSyncError, TokenType, VariableValue};
use serde_json::{Map, Value, json};

/// Caller-facing export knobs.
///
/// `exported_at` is the volatile timestamp stamped into the payload; the
/// engine never reads a clock itself.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Mode selector, matched against mode name or mode identity per
    /// collection. Unmatched or absent falls back to each collection's
    /// default mode.
    pub mode: Option<String>,
    /// Return a valid empty payload instead of failing when nothing is
    /// exportable.
    pub allow_empty: bool,
    pub exported_at: String,
}

fn mode_for_collection(collection: &Collection, requested: Option<&str>) -> ModeId {
    let Some(selector) = requested else {
        return collection.default_mode;
    };
    collection
        .modes
        .iter()
        .find(|mode| mode.name == selector || mode.id.0.to_string() == selector)
        .map_or(collection.default_mode, |mode| mode.id)
}

/// Interchange type tag for a variable: its recorded raw type, else the
/// default tag for its resolved type.
fn export_type_tag(raw_type: &str, resolved_type: TokenType) -> String {
    let trimmed = raw_type.trim();
    if trimmed.is_empty() {
        resolved_type.default_tag().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Integral floats serialize as JSON integers, matching how they arrived.
fn json_number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn path_segments(collection_name: &str, variable_name: &str) -> Vec<String> {
    let mut segments = vec![collection_name.to_string()];
    segments.extend(
        variable_name
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(ToString::to_string),
    );
    segments
}

fn set_nested(target: &mut Map<String, Value>, segments: &[String], token: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut cursor = target;
    for key in parents {
        let entry = cursor
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Some(next) = entry.as_object_mut() else {
            return;
        };
        cursor = next;
    }
    cursor.insert(last.clone(), token);
}

/// Export the store's variables as a canonical token payload.
///
/// Variables whose paths have fewer than two segments are skipped silently;
/// variables without a value in the selected mode, or whose value shape
/// disagrees with their resolved type, count into `summary.skippedCount`.
pub fn export_tokens<S: VariableStore>(
    store: &S,
    options: &ExportOptions,
) -> Result<Value, TokenSyncError> {
    let collections = store.collections()?;
    let collection_by_id: std::collections::BTreeMap<_, _> = collections
        .iter()
        .map(|collection| (collection.id, collection))
        .collect();

    let mut variables = store.variables()?;
    variables.sort_by(|left, right| {
        let left_collection = collection_by_id
            .get(&left.collection)
            .map_or("", |c| c.name.as_str());
        let right_collection = collection_by_id
            .get(&right.collection)
            .map_or("", |c| c.name.as_str());
        left_collection
            .cmp(right_collection)
            .then_with(|| left.name.cmp(&right.name))
    });
    let variable_by_id: std::collections::BTreeMap<_, _> = variables
        .iter()
        .map(|variable| (variable.id, variable))
        .collect();

    let mut tokens = Map::new();
    let mut exported_collections: Vec<String> = Vec::new();
    let mut exported_count = 0usize;
    let mut exported_alias_count = 0usize;
    let mut skipped_count = 0usize;

    for variable in &variables {
        let Some(collection) = collection_by_id.get(&variable.collection) else {
            continue;
        };
        if !exported_collections.contains(&collection.name) {
            exported_collections.push(collection.name.clone());
        }

        let segments = path_segments(&collection.name, &variable.name);
        if segments.len() < 2 {
            continue;
        }

        let mode = mode_for_collection(collection, options.mode.as_deref());
        let value = variable.values_by_mode.get(&mode);

        let token = match value {
            Some(VariableValue::Alias(source_id)) => {
                let source = variable_by_id
                    .get(source_id)
                    .and_then(|source| {
                        collection_by_id
                            .get(&source.collection)
                            .map(|source_collection| (source, source_collection))
                    });
                let Some((source, source_collection)) = source else {
                    skipped_count += 1;
                    continue;
                };
                let source_path = path_segments(&source_collection.name, &source.name);
                exported_alias_count += 1;
                json!({
                    "type": export_type_tag(&variable.raw_type, variable.resolved_type),
                    "value": format!("{{{}}}", source_path.join(".")),
                })
            }
            Some(VariableValue::Color(color)) if variable.resolved_type == TokenType::Color => {
                json!({
                    "type": export_type_tag(&variable.raw_type, TokenType::Color),
                    "value": color.to_hex(),
                })
            }
            Some(VariableValue::Number(amount)) if variable.resolved_type == TokenType::Number => {
                json!({
                    "type": export_type_tag(&variable.raw_type, TokenType::Number),
                    "value": json_number(*amount),
                })
            }
            Some(VariableValue::Text(text)) if variable.resolved_type == TokenType::Text => {
                let round_tripped = if variable.complex_json
                    || infer::is_complex_token_type(&variable.raw_type)
                {
                    serde_json::from_str::<Value>(text)
                        .unwrap_or_else(|_| Value::String(text.clone()))
                } else {
                    Value::String(text.clone())
                };
                json!({
                    "type": export_type_tag(&variable.raw_type, TokenType::Text),
                    "value": round_tripped,
                })
            }
            _ => {
                skipped_count += 1;
                continue;
            }
        };

        set_nested(&mut tokens, &segments, token);
        exported_count += 1;
    }

    if exported_count == 0 && !options.allow_empty {
        return Err(TokenSyncError::NothingToExport);
    }

    Ok(json!({
        "$schemaVersion": SCHEMA_VERSION,
        "$format": EXPORT_FORMAT,
        "$source": EXPORT_SOURCE,
        "$exportedAt": options.exported_at,
        "meta": {
            "exportScope": "all-collections",
            "collections": exported_collections,
        },
        "summary": {
            "exportedCount": exported_count,
            "exportedAliasCount": exported_alias_count,
            "skippedCount": skipped_count,
        },
        "tokens": tokens,
    }))
}

// =============================================================================
// TESTS
// =============================================================================
