// crates/storage/src/entities/search.rs
//! The saved-search entity

use super::common::{
    changed_fields, delete_changes_by_id, ChangeType, ObjectChange, SyncMeta,
};
use citestream_core::LibraryId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Field groups a search delta can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchChange {
    /// Name changed
    Name,
    /// Condition list changed
    Conditions,
}

/// One ordered condition of a saved search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCondition {
    /// Field or pseudo-field the condition tests
    pub condition: String,
    /// Comparison operator
    pub operator: String,
    /// Comparison value
    pub value: String,
    /// Position in the condition list
    pub sort_index: i32,
}

/// Saved search over the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Search {
    /// Stable remote id
    pub key: String,
    /// Library this search belongs to
    pub library_id: LibraryId,
    /// Display name
    pub name: String,
    /// Ordered conditions
    pub conditions: Vec<SearchCondition>,
    /// Search sits in the trash
    pub trash: bool,
    /// Sync bookkeeping
    pub meta: SyncMeta,
    /// Pending deltas
    pub changes: Vec<ObjectChange<SearchChange>>,
}

impl Search {
    /// Creates a search created by user action
    pub fn new(key: impl Into<String>, library_id: LibraryId, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            library_id,
            name: name.into(),
            conditions: Vec::new(),
            trash: false,
            meta: SyncMeta::new_user(),
            changes: Vec::new(),
        }
    }

    /// True while any delta awaits acknowledgment
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Union of field groups covered by pending deltas
    pub fn changed_fields(&self) -> Vec<SearchChange> {
        changed_fields(&self.changes)
    }

    /// Appends a delta covering name and conditions; idempotent
    pub fn mark_as_changed_local(&mut self) {
        let groups = vec![SearchChange::Name, SearchChange::Conditions];
        let pending = self.changed_fields();
        let fully_dirty = groups.iter().all(|g| pending.contains(g));

        if !fully_dirty {
            self.changes.push(ObjectChange::new(groups));
        }

        self.meta.change_type = ChangeType::User;
        self.meta.deleted = false;
        self.meta.version = 0;
    }

    /// Removes exactly the acknowledged delta subset
    pub fn delete_changes(&mut self, identifiers: &[Uuid]) {
        delete_changes_by_id(&mut self.changes, identifiers);
        self.meta.change_type = ChangeType::SyncResponse;
    }

    /// Clears all deltas; used when remote data is authoritative
    pub fn delete_all_changes(&mut self) {
        if !self.is_changed() {
            return;
        }
        self.changes.clear();
        self.meta.change_type = ChangeType::Sync;
    }

    /// Update-parameter payload for upload, `None` when nothing is pending
    pub fn update_parameters(&self) -> Option<Map<String, Value>> {
        if !self.is_changed() {
            return None;
        }

        let mut parameters = Map::new();
        parameters.insert("key".to_string(), json!(self.key));
        parameters.insert("version".to_string(), json!(self.meta.version));

        let changes = self.changed_fields();
        if changes.contains(&SearchChange::Name) {
            parameters.insert("name".to_string(), json!(self.name));
        }
        if changes.contains(&SearchChange::Conditions) {
            let mut sorted: Vec<&SearchCondition> = self.conditions.iter().collect();
            sorted.sort_by_key(|c| c.sort_index);
            let conditions: Vec<Value> = sorted
                .iter()
                .map(|c| {
                    json!({
                        "condition": c.condition,
                        "operator": c.operator,
                        "value": c.value,
                    })
                })
                .collect();
            parameters.insert("conditions".to_string(), json!(conditions));
        }

        Some(parameters)
    }
}
