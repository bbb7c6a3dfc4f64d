//! # Variable Store
//!
//! The store capability consumed by the engine, plus the in-memory
//! implementation used by the CLI and as the test double.
//!
//! The engine never reaches for an ambient store handle; every operation
//! takes the store as an explicit parameter.

use crate::types::{
    Collection, CollectionId, Mode, ModeId, TokenSyncError, TokenType, Variable, VariableId,
    VariableValue,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// VARIABLESTORE TRAIT
// =============================================================================

/// Variable and collection CRUD as an abstract capability.
///
/// All fallible operations return `Result<T, TokenSyncError>`; adapter
/// implementations map their own failures into [`TokenSyncError::Store`].
/// Returned entities are owned snapshots, valid until the next mutation.
pub trait VariableStore {
    /// All collections, in deterministic order.
    fn collections(&self) -> Result<Vec<Collection>, TokenSyncError>;

    /// Find a collection by name, creating it (with a default mode) when
    /// absent.
    fn get_or_create_collection(&mut self, name: &str) -> Result<Collection, TokenSyncError>;

    /// All variables across all collections, in deterministic order.
    fn variables(&self) -> Result<Vec<Variable>, TokenSyncError>;

    /// Create a variable with the given resolved type and no values.
    fn create_variable(
        &mut self,
        name: &str,
        collection: CollectionId,
        resolved_type: TokenType,
    ) -> Result<Variable, TokenSyncError>;

    /// Remove a variable entirely.
    fn remove_variable(&mut self, id: VariableId) -> Result<(), TokenSyncError>;

    /// Set a variable's value for one mode of its collection.
    fn set_value(
        &mut self,
        id: VariableId,
        mode: ModeId,
        value: VariableValue,
    ) -> Result<(), TokenSyncError>;

    /// Read a variable's value for one mode, if set.
    fn get_value(&self, id: VariableId, mode: ModeId)
    -> Result<Option<VariableValue>, TokenSyncError>;

    /// Record the opaque per-variable metadata: the raw interchange type tag
    /// and the complex-JSON flag.
    fn set_metadata(
        &mut self,
        id: VariableId,
        raw_type: &str,
        complex_json: bool,
    ) -> Result<(), TokenSyncError>;
}

// =============================================================================
// MEMORYSTORE
// =============================================================================

/// `BTreeMap`-backed [`VariableStore`].
///
/// Deterministic iteration, serde-persistable as a JSON file. The CLI's
/// local store and the engine's test double.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    collections: BTreeMap<CollectionId, Collection>,
    variables: BTreeMap<VariableId, Variable>,
    next_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection, TokenSyncError> {
        self.collections
            .get_mut(&id)
            .ok_or_else(|| TokenSyncError::Store(format!("unknown collection id {}", id.0)))
    }

    /// Add a mode to an existing collection. Returns the new mode's id.
    pub fn add_mode(
        &mut self,
        collection: CollectionId,
        name: &str,
    ) -> Result<ModeId, TokenSyncError> {
        let mode_id = ModeId(self.fresh_id());
        let entry = self.collection_mut(collection)?;
        entry.modes.push(Mode {
            id: mode_id,
            name: name.to_string(),
        });
        Ok(mode_id)
    }
}

impl VariableStore for MemoryStore {
    fn collections(&self) -> Result<Vec<Collection>, TokenSyncError> {
        Ok(self.collections.values().cloned().collect())
    }

    fn get_or_create_collection(&mut self, name: &str) -> Result<Collection, TokenSyncError> {
        if let Some(existing) = self
            .collections
            .values()
            .find(|collection| collection.name == name)
        {
            return Ok(existing.clone());
        }

        let collection_id = CollectionId(self.fresh_id());
        let mode_id = ModeId(self.fresh_id());
        let collection = Collection {
            id: collection_id,
            name: name.to_string(),
            modes: vec![Mode {
                id: mode_id,
                name: "Default".to_string(),
            }],
            default_mode: mode_id,
        };
        self.collections.insert(collection_id, collection.clone());
        Ok(collection)
    }

    fn variables(&self) -> Result<Vec<Variable>, TokenSyncError> {
        Ok(self.variables.values().cloned().collect())
    }

    fn create_variable(
        &mut self,
        name: &str,
        collection: CollectionId,
        resolved_type: TokenType,
    ) -> Result<Variable, TokenSyncError> {
        if !self.collections.contains_key(&collection) {
            return Err(TokenSyncError::Store(format!(
                "unknown collection id {}",
                collection.0
            )));
        }
        let duplicate = self
            .variables
            .values()
            .any(|variable| variable.collection == collection && variable.name == name);
        if duplicate {
            return Err(TokenSyncError::Store(format!(
                "variable \"{name}\" already exists in its collection"
            )));
        }

        let variable = Variable {
            id: VariableId(self.fresh_id()),
            name: name.to_string(),
            collection,
            resolved_type,
            values_by_mode: BTreeMap::new(),
            raw_type: String::new(),
            complex_json: false,
        };
        self.variables.insert(variable.id, variable.clone());
        Ok(variable)
    }

    fn remove_variable(&mut self, id: VariableId) -> Result<(), TokenSyncError> {
        if self.variables.remove(&id).is_none() {
            return Err(TokenSyncError::Store(format!("unknown variable id {}", id.0)));
        }
        Ok(())
    }

    fn set_value(
        &mut self,
        id: VariableId,
        mode: ModeId,
        value: VariableValue,
    ) -> Result<(), TokenSyncError> {
        let collection_id = self
            .variables
            .get(&id)
            .map(|variable| variable.collection)
            .ok_or_else(|| TokenSyncError::Store(format!("unknown variable id {}", id.0)))?;
        let collection = self
            .collections
            .get(&collection_id)
            .ok_or_else(|| TokenSyncError::Store(format!("unknown collection id {}", collection_id.0)))?;
        if !collection.modes.iter().any(|m| m.id == mode) {
            return Err(TokenSyncError::Store(format!(
                "mode {} does not belong to collection \"{}\"",
                mode.0, collection.name
            )));
        }
        if let Some(variable) = self.variables.get_mut(&id) {
            variable.values_by_mode.insert(mode, value);
        }
        Ok(())
    }

    fn get_value(
        &self,
        id: VariableId,
        mode: ModeId,
    ) -> Result<Option<VariableValue>, TokenSyncError> {
        let variable = self
            .variables
            .get(&id)
            .ok_or_else(|| TokenSyncError::Store(format!("unknown variable id {}", id.0)))?;
        Ok(variable.values_by_mode.get(&mode).cloned())
    }

    fn set_metadata(
        &mut self,
        id: VariableId,
        raw_type: &str,
        complex_json: bool,
    ) -> Result<(), TokenSyncError> {
        let variable = self
            .variables
            .get_mut(&id)
            .ok_or_else(|| TokenSyncError::Store(format!("unknown variable id {}", id.0)))?;
        variable.raw_type = raw_type.to_string();
        variable.complex_json = complex_json;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut store = MemoryStore::new();
        let first = store.get_or_create_collection("Tokens").unwrap();
        let second = store.get_or_create_collection("Tokens").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.collections().unwrap().len(), 1);
    }

    #[test]
    fn new_collection_has_a_default_mode() {
        let mut store = MemoryStore::new();
        let collection = store.get_or_create_collection("Tokens").unwrap();
        assert_eq!(collection.modes.len(), 1);
        assert_eq!(collection.modes[0].id, collection.default_mode);
    }

    #[test]
    fn create_set_get_round_trip() {
        let mut store = MemoryStore::new();
        let collection = store.get_or_create_collection("Tokens").unwrap();
        let variable = store
            .create_variable("color/brand", collection.id, TokenType::Number)
            .unwrap();
        store
            .set_value(variable.id, collection.default_mode, VariableValue::Number(8.0))
            .unwrap();
        let value = store.get_value(variable.id, collection.default_mode).unwrap();
        assert_eq!(value, Some(VariableValue::Number(8.0)));
    }

    #[test]
    fn duplicate_names_in_one_collection_are_rejected() {
        let mut store = MemoryStore::new();
        let collection = store.get_or_create_collection("Tokens").unwrap();
        store
            .create_variable("a", collection.id, TokenType::Text)
            .unwrap();
        assert!(
            store
                .create_variable("a", collection.id, TokenType::Text)
                .is_err()
        );
    }

    #[test]
    fn same_name_allowed_across_collections() {
        let mut store = MemoryStore::new();
        let first = store.get_or_create_collection("Base").unwrap();
        let second = store.get_or_create_collection("Theme").unwrap();
        store.create_variable("a", first.id, TokenType::Text).unwrap();
        assert!(store.create_variable("a", second.id, TokenType::Text).is_ok());
    }

    #[test]
    fn set_value_rejects_foreign_mode() {
        let mut store = MemoryStore::new();
        let first = store.get_or_create_collection("Base").unwrap();
        let second = store.get_or_create_collection("Theme").unwrap();
        let variable = store
            .create_variable("a", first.id, TokenType::Number)
            .unwrap();
        let result = store.set_value(
            variable.id,
            second.default_mode,
            VariableValue::Number(1.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn removed_variable_is_gone() {
        let mut store = MemoryStore::new();
        let collection = store.get_or_create_collection("Tokens").unwrap();
        let variable = store
            .create_variable("a", collection.id, TokenType::Text)
            .unwrap();
        store.remove_variable(variable.id).unwrap();
        assert!(store.variables().unwrap().is_empty());
        assert!(store.remove_variable(variable.id).is_err());
    }

    #[test]
    fn metadata_persists_on_variable() {
        let mut store = MemoryStore::new();
        let collection = store.get_or_create_collection("Tokens").unwrap();
        let variable = store
            .create_variable("t", collection.id, TokenType::Text)
            .unwrap();
        store.set_metadata(variable.id, "typography", true).unwrap();
        let stored = store.variables().unwrap().remove(0);
        assert_eq!(stored.raw_type, "typography");
        assert!(stored.complex_json);
    }

    #[test]
    fn serde_round_trip_preserves_contents() {
        let mut store = MemoryStore::new();
        let collection = store.get_or_create_collection("Tokens").unwrap();
        store
            .create_variable("color/brand", collection.id, TokenType::Color)
            .unwrap();

        let serialized = serde_json::to_string(&store).unwrap();
        let mut restored: MemoryStore = serde_json::from_str(&serialized).unwrap();
        assert_eq!(restored.variables().unwrap().len(), 1);

        // Fresh ids continue past the restored ones.
        let other = restored.get_or_create_collection("Theme").unwrap();
        assert!(other.id.0 > collection.id.0);
    }
}
