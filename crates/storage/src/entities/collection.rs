// crates/storage/src/entities/collection.rs
//! The collection entity: named hierarchical grouping of items

use super::common::{
    changed_fields, delete_changes_by_id, ChangeType, ObjectChange, SyncMeta,
};
use chrono::{DateTime, Utc};
use citestream_core::LibraryId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Field groups a collection delta can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionChange {
    /// Name changed
    Name,
    /// Parent assignment changed
    Parent,
}

/// Named hierarchical grouping of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Stable remote id
    pub key: String,
    /// Library this collection belongs to
    pub library_id: LibraryId,
    /// Display name
    pub name: String,
    /// Parent collection key; the tree is walked with cycle detection
    pub parent_key: Option<String>,
    /// Collapsed in the sidebar
    pub collapsed: bool,
    pub date_modified: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    /// Collection sits in the trash
    pub trash: bool,
    /// Sync bookkeeping
    pub meta: SyncMeta,
    /// Pending deltas
    pub changes: Vec<ObjectChange<CollectionChange>>,
}

impl Collection {
    /// Creates a collection created by user action
    pub fn new(key: impl Into<String>, library_id: LibraryId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            library_id,
            name: name.into(),
            parent_key: None,
            collapsed: true,
            date_modified: now,
            last_used: now,
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
    pub fn changed_fields(&self) -> Vec<CollectionChange> {
        changed_fields(&self.changes)
    }

    /// The full significant field-group set for this collection
    pub fn significant_change_groups(&self) -> Vec<CollectionChange> {
        let mut groups = vec![CollectionChange::Name];
        if self.parent_key.is_some() {
            groups.push(CollectionChange::Parent);
        }
        groups
    }

    /// Appends a delta covering the full significant field-group set.
    /// Idempotent like the item variant; child recursion and membership
    /// deltas on contained items are the caller's job.
    pub fn mark_as_changed_local(&mut self) {
        let groups = self.significant_change_groups();
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
        if changes.contains(&CollectionChange::Name) {
            parameters.insert("name".to_string(), json!(self.name));
        }
        if changes.contains(&CollectionChange::Parent) {
            let parent = match &self.parent_key {
                Some(key) => json!(key),
                None => json!(false),
            };
            parameters.insert("parentCollection".to_string(), parent);
        }

        Some(parameters)
    }
}
