//! # Import Pass
//!
//! Parses a token payload, coerces each leaf into the store's native value
//! representation, and drives alias resolution to a fixed point.
//!
//! Per-token issues become warnings and the pass continues; structural and
//! store failures abort. Every mutation that occurs is reflected in the
//! returned counts even when later tokens fail.

use crate::alias;
use crate::infer;
use crate::parser;
use crate::primitives::DEFAULT_COLLECTION_NAME;
use crate::store::VariableStore;
use crate::types::{
    CollectionId, ImportResult, PendingAlias, TokenSyncError, TokenType, VariableId, VariableValue,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Collection named by a top-level `collection` string in the payload, else
/// the default collection.
fn collection_name_for_payload(payload: &Value) -> &str {
    payload
        .as_object()
        .and_then(|object| object.get("collection"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_COLLECTION_NAME)
}

/// Metadata raw type recorded on a variable: the trimmed hint, defaulting to
/// `string` for text variables with no hint.
fn metadata_raw_type(raw_type: Option<&str>, resolved_type: TokenType) -> String {
    let trimmed = raw_type.unwrap_or("").trim();
    if trimmed.is_empty() && resolved_type == TokenType::Text {
        return "string".to_string();
    }
    trimmed.to_string()
}

/// Remove a variable and recreate it under the same name with a new type.
fn replace_with_type<S: VariableStore>(
    store: &mut S,
    existing: VariableId,
    name: &str,
    collection: CollectionId,
    resolved_type: TokenType,
) -> Result<VariableId, TokenSyncError> {
    store.remove_variable(existing)?;
    Ok(store.create_variable(name, collection, resolved_type)?.id)
}

/// Index state kept in step with store mutations during one import pass.
struct ImportIndex {
    target_collection: String,
    by_name_in_target: BTreeMap<String, VariableId>,
    by_scoped_name: BTreeMap<String, VariableId>,
    type_by_id: BTreeMap<VariableId, TokenType>,
    collection_names: Vec<String>,
}

impl ImportIndex {
    fn record(&mut self, name: &str, id: VariableId, resolved_type: TokenType) {
        self.by_name_in_target.insert(name.to_string(), id);
        self.by_scoped_name.insert(
            alias::scoped_variable_key(&self.target_collection, name),
            id,
        );
        self.type_by_id.insert(id, resolved_type);
    }
}

/// Import a token payload into the store.
///
/// Non-alias tokens are coerced and created/updated (replaced when the
/// existing variable's type differs). Alias tokens are deferred to a
/// worklist driven to a fixed point: passes repeat until the pending set is
/// empty or a pass makes zero progress, at which point the leftovers are
/// skipped with unresolved-alias warnings. At most `initial pending` passes
/// run.
pub fn import_tokens<S: VariableStore>(
    store: &mut S,
    payload: &Value,
) -> Result<ImportResult, TokenSyncError> {
    let tokens = parser::parse_tokens(payload)?;
    let collection = store.get_or_create_collection(collection_name_for_payload(payload))?;
    let mode = collection.default_mode;

    let all_collections = store.collections()?;
    let name_by_collection: BTreeMap<CollectionId, String> = all_collections
        .iter()
        .map(|c| (c.id, c.name.clone()))
        .collect();
    let mut index = ImportIndex {
        target_collection: collection.name.clone(),
        by_name_in_target: BTreeMap::new(),
        by_scoped_name: BTreeMap::new(),
        type_by_id: BTreeMap::new(),
        collection_names: all_collections.iter().map(|c| c.name.clone()).collect(),
    };
    for variable in store.variables()? {
        let Some(owner) = name_by_collection.get(&variable.collection) else {
            continue;
        };
        index.by_scoped_name.insert(
            alias::scoped_variable_key(owner, &variable.name),
            variable.id,
        );
        index.type_by_id.insert(variable.id, variable.resolved_type);
        if variable.collection == collection.id {
            index
                .by_name_in_target
                .insert(variable.name.clone(), variable.id);
        }
    }

    let mut warnings: Vec<String> = Vec::new();
    let mut pending: Vec<PendingAlias> = Vec::new();
    let mut created = 0usize;
    let mut updated = 0usize;
    let mut replaced = 0usize;
    let mut skipped = 0usize;

    for token in tokens {
        if let Some(reference) = alias::parse_alias_reference(&token.value) {
            pending.push(PendingAlias {
                token,
                reference_path: reference.path,
                raw_reference: reference.raw,
                reference_inner: reference.inner,
            });
            continue;
        }

        let Some(resolved_type) = infer::infer_token_type(token.raw_type.as_deref(), &token.value)
        else {
            skipped += 1;
            let unsupported = token.raw_type.as_deref().unwrap_or("unknown");
            warnings.push(format!(
                "Skipped {}: unsupported type \"{unsupported}\".",
                token.name
            ));
            continue;
        };

        let (next_value, is_complex) = match infer::coerce_value(resolved_type, &token.value) {
            Ok(coerced) => coerced,
            Err(reason) => {
                skipped += 1;
                warnings.push(format!("Skipped {}: {reason}", token.name));
                continue;
            }
        };
        let raw_type = metadata_raw_type(token.raw_type.as_deref(), resolved_type);
        let complex_flag = resolved_type == TokenType::Text && is_complex;

        if let Some(existing_id) = index.by_name_in_target.get(&token.name).copied() {
            let existing_type = index
                .type_by_id
                .get(&existing_id)
                .copied()
                .unwrap_or(resolved_type);
            if existing_type == resolved_type {
                store.set_value(existing_id, mode, next_value)?;
                store.set_metadata(existing_id, &raw_type, complex_flag)?;
                updated += 1;
                continue;
            }

            // Replacement failure is a per-token warning, not an abort.
            let replacement = replace_with_type(
                store,
                existing_id,
                &token.name,
                collection.id,
                resolved_type,
            )
            .and_then(|new_id| {
                store.set_value(new_id, mode, next_value.clone())?;
                store.set_metadata(new_id, &raw_type, complex_flag)?;
                Ok(new_id)
            });
            match replacement {
                Ok(new_id) => {
                    index.record(&token.name, new_id, resolved_type);
                    replaced += 1;
                    warnings.push(format!(
                        "Replaced {}: variable type changed from {existing_type} to {resolved_type}.",
                        token.name
                    ));
                }
                Err(error) => {
                    skipped += 1;
                    warnings.push(format!(
                        "Skipped {}: type mismatch ({existing_type} vs {resolved_type}) and replacement failed. {error}",
                        token.name
                    ));
                }
            }
            continue;
        }

        let new_variable = store.create_variable(&token.name, collection.id, resolved_type)?;
        store.set_value(new_variable.id, mode, next_value)?;
        store.set_metadata(new_variable.id, &raw_type, complex_flag)?;
        index.record(&token.name, new_variable.id, resolved_type);
        created += 1;
    }

    // Fixed-point worklist: each pass retries every still-pending alias; a
    // pass that resolves nothing ends the loop.
    let mut unresolved = pending;
    let mut made_progress = true;
    while !unresolved.is_empty() && made_progress {
        made_progress = false;
        let mut next_unresolved: Vec<PendingAlias> = Vec::new();

        for alias_token in unresolved {
            let Some(source_id) = alias::resolve_alias_source(
                &alias_token.reference_path,
                &alias_token.reference_inner,
                &collection.name,
                &index.by_name_in_target,
                &index.by_scoped_name,
                &index.collection_names,
            ) else {
                next_unresolved.push(alias_token);
                continue;
            };
            let Some(source_type) = index.type_by_id.get(&source_id).copied() else {
                next_unresolved.push(alias_token);
                continue;
            };

            let explicit_type = infer::infer_from_raw_type(alias_token.token.raw_type.as_deref());
            if let Some(explicit) = explicit_type {
                if explicit != source_type {
                    skipped += 1;
                    warnings.push(format!(
                        "Skipped {}: alias type \"{explicit}\" does not match source type \"{source_type}\".",
                        alias_token.token.name
                    ));
                    continue;
                }
            }

            let token_name = alias_token.token.name.clone();
            let target_type = explicit_type.unwrap_or(source_type);
            let existing_target = index.by_name_in_target.get(&token_name).copied();
            let mut created_in_step = false;
            let mut replaced_in_step = false;

            let target_id = match existing_target {
                None => {
                    let variable =
                        store.create_variable(&token_name, collection.id, target_type)?;
                    index.record(&token_name, variable.id, target_type);
                    created_in_step = true;
                    variable.id
                }
                Some(existing_id) => {
                    let previous_type = index
                        .type_by_id
                        .get(&existing_id)
                        .copied()
                        .unwrap_or(target_type);
                    if previous_type == target_type {
                        existing_id
                    } else {
                        match replace_with_type(
                            store,
                            existing_id,
                            &token_name,
                            collection.id,
                            target_type,
                        ) {
                            Ok(new_id) => {
                                index.record(&token_name, new_id, target_type);
                                replaced_in_step = true;
                                replaced += 1;
                                warnings.push(format!(
                                    "Replaced {token_name}: variable type changed from {previous_type} to {target_type} for alias import."
                                ));
                                new_id
                            }
                            Err(error) => {
                                skipped += 1;
                                warnings.push(format!(
                                    "Skipped {token_name}: existing variable type {previous_type} does not match alias type {target_type}. Replacement failed. {error}"
                                ));
                                continue;
                            }
                        }
                    }
                }
            };

            if target_id == source_id {
                skipped += 1;
                warnings.push(format!(
                    "Skipped {token_name}: alias cannot reference itself ({}).",
                    alias_token.raw_reference
                ));
                continue;
            }

            let raw_type = metadata_raw_type(alias_token.token.raw_type.as_deref(), target_type);
            let applied = store
                .set_value(target_id, mode, VariableValue::Alias(source_id))
                .and_then(|()| store.set_metadata(target_id, &raw_type, false));
            match applied {
                Ok(()) => {
                    if created_in_step {
                        created += 1;
                    } else if !replaced_in_step {
                        updated += 1;
                    }
                    made_progress = true;
                }
                Err(error) => {
                    skipped += 1;
                    warnings.push(format!(
                        "Skipped {token_name}: failed to set alias {}. {error}",
                        alias_token.raw_reference
                    ));
                }
            }
        }

        unresolved = next_unresolved;
    }

    for leftover in unresolved {
        skipped += 1;
        warnings.push(format!(
            "Skipped {}: unresolved alias reference {}.",
            leftover.token.name, leftover.raw_reference
        ));
    }

    Ok(ImportResult {
        collection: collection.name,
        imported: created + updated + replaced,
        created,
        updated,
        replaced,
        skipped,
        warnings,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn variable_named(store: &MemoryStore, name: &str) -> crate::types::Variable {
        store
            .variables()
            .unwrap()
            .into_iter()
            .find(|v| v.name == name)
            .unwrap_or_else(|| panic!("variable {name} not found"))
    }

    #[test]
    fn imports_single_color_token() {
        let mut store = MemoryStore::new();
        let payload = json!({
            "color": { "brand": { "value": "#336699", "type": "color" } }
        });
        let result = import_tokens(&mut store, &payload).unwrap();
        assert_eq!(result.collection, DEFAULT_COLLECTION_NAME);
        assert_eq!(result.created, 1);
        assert_eq!(result.imported, 1);
        assert!(result.warnings.is_empty());

        let variable = variable_named(&store, "color/brand");
        assert_eq!(variable.resolved_type, TokenType::Color);
        assert_eq!(variable.raw_type, "color");
    }

    #[test]
    fn payload_collection_field_names_the_target() {
        let mut store = MemoryStore::new();
        let payload = json!({
            "collection": "  Brand  ",
            "size": { "sm": { "value": "4px" } }
        });
        let result = import_tokens(&mut store, &payload).unwrap();
        assert_eq!(result.collection, "Brand");
    }

    #[test]
    fn reimport_updates_in_place() {
        let mut store = MemoryStore::new();
        let payload = json!({ "size": { "sm": { "value": 4, "type": "number" } } });
        import_tokens(&mut store, &payload).unwrap();

        let payload = json!({ "size": { "sm": { "value": 8, "type": "number" } } });
        let result = import_tokens(&mut store, &payload).unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(result.created, 0);

        let variable = variable_named(&store, "size/sm");
        let value = variable.values_by_mode.values().next().unwrap();
        assert_eq!(value, &VariableValue::Number(8.0));
    }

    #[test]
    fn type_mismatch_replaces_with_warning() {
        let mut store = MemoryStore::new();
        import_tokens(
            &mut store,
            &json!({ "t": { "value": 4, "type": "number" } }),
        )
        .unwrap();
        let result = import_tokens(
            &mut store,
            &json!({ "t": { "value": "#fff", "type": "color" } }),
        )
        .unwrap();
        assert_eq!(result.replaced, 1);
        assert_eq!(result.imported, 1);
        assert!(result.warnings[0].starts_with("Replaced t:"));
        assert_eq!(variable_named(&store, "t").resolved_type, TokenType::Color);
    }

    #[test]
    fn unsupported_tokens_are_skipped_with_warnings() {
        let mut store = MemoryStore::new();
        let payload = json!({
            "bad_color": { "value": "nope", "type": "color" },
            "bad_number": { "value": "abc", "type": "number" },
            "untyped_object": { "value": [1, 2, 3] }
        });
        let result = import_tokens(&mut store, &payload).unwrap();
        assert_eq!(result.skipped, 3);
        assert_eq!(result.imported, 0);
        assert_eq!(result.warnings.len(), 3);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("could not parse color"))
        );
        assert!(result.warnings.iter().any(|w| w.contains("must be numeric")));
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("unsupported type"))
        );
    }

    #[test]
    fn alias_resolves_to_earlier_token() {
        let mut store = MemoryStore::new();
        import_tokens(
            &mut store,
            &json!({ "color": { "brand": { "value": "#336699", "type": "color" } } }),
        )
        .unwrap();
        let result =
            import_tokens(&mut store, &json!({ "a": { "value": "{color.brand}" } })).unwrap();
        assert_eq!(result.created, 1);
        assert!(result.warnings.is_empty());

        let alias_variable = variable_named(&store, "a");
        assert_eq!(alias_variable.resolved_type, TokenType::Color);
        let source = variable_named(&store, "color/brand");
        let value = alias_variable.values_by_mode.values().next().unwrap();
        assert_eq!(value, &VariableValue::Alias(source.id));
    }

    #[test]
    fn forward_reference_resolves_within_one_import() {
        let mut store = MemoryStore::new();
        let payload = json!({
            "a": { "value": "{b.c}" },
            "b": { "c": { "value": "#ff0000", "type": "color" } }
        });
        let result = import_tokens(&mut store, &payload).unwrap();
        assert_eq!(result.created, 2);
        assert_eq!(result.skipped, 0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn chained_aliases_converge_across_passes() {
        let mut store = MemoryStore::new();
        // a -> b -> c; a cannot resolve until b exists.
        let payload = json!({
            "a": { "value": "{b}" },
            "b": { "value": "{c}" },
            "c": { "value": "#00ff00", "type": "color" }
        });
        let result = import_tokens(&mut store, &payload).unwrap();
        assert_eq!(result.created, 3);
        assert!(result.warnings.is_empty());
        assert_eq!(variable_named(&store, "a").resolved_type, TokenType::Color);
    }

    #[test]
    fn unresolved_alias_warns_and_creates_nothing_for_it() {
        let mut store = MemoryStore::new();
        let result =
            import_tokens(&mut store, &json!({ "a": { "value": "{missing.token}" } })).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.created + result.updated + result.replaced, 0);
        assert!(
            result.warnings[0].contains("unresolved alias reference {missing.token}"),
            "warning was: {}",
            result.warnings[0]
        );
    }

    #[test]
    fn self_referential_alias_is_skipped() {
        let mut store = MemoryStore::new();
        import_tokens(
            &mut store,
            &json!({ "a": { "value": "#fff", "type": "color" } }),
        )
        .unwrap();
        let result = import_tokens(&mut store, &json!({ "a": { "value": "{a}" } })).unwrap();
        assert_eq!(result.skipped, 1);
        assert!(result.warnings[0].contains("alias cannot reference itself"));
    }

    #[test]
    fn alias_with_conflicting_explicit_type_is_skipped() {
        let mut store = MemoryStore::new();
        import_tokens(
            &mut store,
            &json!({ "color": { "brand": { "value": "#336699", "type": "color" } } }),
        )
        .unwrap();
        let result = import_tokens(
            &mut store,
            &json!({ "a": { "value": "{color.brand}", "type": "number" } }),
        )
        .unwrap();
        assert_eq!(result.skipped, 1);
        assert!(result.warnings[0].contains("does not match source type"));
    }

    #[test]
    fn circular_aliases_terminate_with_warnings() {
        let mut store = MemoryStore::new();
        let payload = json!({
            "a": { "value": "{b}" },
            "b": { "value": "{a}" }
        });
        let result = import_tokens(&mut store, &payload).unwrap();
        assert_eq!(result.skipped, 2);
        assert_eq!(result.warnings.len(), 2);
        assert!(
            result
                .warnings
                .iter()
                .all(|w| w.contains("unresolved alias reference"))
        );
    }

    #[test]
    fn cross_collection_alias_resolves_via_scoped_name() {
        let mut store = MemoryStore::new();
        import_tokens(
            &mut store,
            &json!({
                "collection": "Base",
                "color": { "brand": { "value": "#336699", "type": "color" } }
            }),
        )
        .unwrap();
        let result = import_tokens(
            &mut store,
            &json!({
                "collection": "Theme",
                "primary": { "value": "{Base.color.brand}" }
            }),
        )
        .unwrap();
        assert_eq!(result.created, 1);
        assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
    }

    #[test]
    fn invalid_payload_mutates_nothing() {
        let mut store = MemoryStore::new();
        assert!(import_tokens(&mut store, &json!(["not", "a", "tree"])).is_err());
        assert!(store.collections().unwrap().is_empty());
    }
}
