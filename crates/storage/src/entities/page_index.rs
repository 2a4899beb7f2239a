// crates/storage/src/entities/page_index.rs
//! Per-attachment reading position, synced through library settings

use super::common::{delete_changes_by_id, ChangeType, ObjectChange, SyncMeta};
use citestream_core::LibraryId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Field groups a page-index delta can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageIndexChange {
    /// The stored position changed
    Index,
}

/// Reading position inside one attachment; only personal libraries sync
/// these through the settings endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIndex {
    /// Key of the attachment item the position belongs to
    pub key: String,
    /// Library scope
    pub library_id: LibraryId,
    /// Raw position value (page number or viewer-specific locator)
    pub index: String,
    /// Sync bookkeeping
    pub meta: SyncMeta,
    /// Pending deltas
    pub changes: Vec<ObjectChange<PageIndexChange>>,
}

impl PageIndex {
    /// Records a user-set position for the given attachment
    pub fn new(key: impl Into<String>, library_id: LibraryId, index: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            library_id,
            index: index.into(),
            meta: SyncMeta::new_user(),
            changes: Vec::new(),
        }
    }

    /// True while any delta awaits acknowledgment
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Records a pending position delta; idempotent
    pub fn mark_as_changed_local(&mut self) {
        if self.changes.is_empty() {
            self.changes
                .push(ObjectChange::new(vec![PageIndexChange::Index]));
        }
        self.meta.change_type = ChangeType::User;
    }

    /// Removes exactly the acknowledged delta subset
    pub fn delete_changes(&mut self, identifiers: &[Uuid]) {
        delete_changes_by_id(&mut self.changes, identifiers);
        self.meta.change_type = ChangeType::SyncResponse;
    }

    /// Settings-entry name for this position
    pub fn settings_key(&self) -> String {
        format!("lastPageIndex_{}", self.key)
    }

    /// Update-parameter payload, a single settings entry
    pub fn update_parameters(&self) -> Option<Map<String, Value>> {
        if !self.is_changed() {
            return None;
        }
        let mut parameters = Map::new();
        parameters.insert(
            self.settings_key(),
            json!({ "value": self.index, "version": self.meta.version }),
        );
        Some(parameters)
    }
}
