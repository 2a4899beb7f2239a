// crates/storage/src/entities/common.rs
//! Sync bookkeeping shared by every syncable kind

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local sync status of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Local data matches the last server state we saw
    Synced,
    /// Object has local data the server has not acknowledged
    Dirty,
    /// Server reported a newer version; object must be re-fetched
    Outdated,
}

/// Who performed the last mutation of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// Direct user action; never silently dropped
    User,
    /// Applied from a sync download
    Sync,
    /// Applied from the response to our own upload
    SyncResponse,
}

/// One pending delta: the field groups a mutation touched, with a stable
/// identifier the upload round uses for acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectChange<F> {
    /// Identifier echoed back by acknowledgment commands
    pub identifier: Uuid,
    /// Field groups this delta covers
    pub fields: Vec<F>,
}

impl<F> ObjectChange<F> {
    /// Creates a delta covering the given field groups
    pub fn new(fields: Vec<F>) -> Self {
        Self {
            identifier: Uuid::new_v4(),
            fields,
        }
    }
}

/// Version/tombstone/delta bookkeeping embedded in every syncable entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    /// Server-assigned revision; monotonic non-decreasing while synced
    pub version: i32,
    /// Local sync status
    pub sync_state: SyncState,
    /// Consecutive failed fetch attempts, drives backoff
    pub sync_retries: i32,
    /// When this object last round-tripped with the server
    pub last_sync_date: Option<DateTime<Utc>>,
    /// Tombstone: excluded from live queries, retained until acknowledged
    pub deleted: bool,
    /// Origin of the last mutation
    pub change_type: ChangeType,
}

impl SyncMeta {
    /// Bookkeeping for an object just created by user action
    pub fn new_user() -> Self {
        Self {
            version: 0,
            sync_state: SyncState::Synced,
            sync_retries: 0,
            last_sync_date: None,
            deleted: false,
            change_type: ChangeType::User,
        }
    }

    /// Bookkeeping for an object just written from a sync download
    pub fn new_synced(version: i32) -> Self {
        Self {
            version,
            sync_state: SyncState::Synced,
            sync_retries: 0,
            last_sync_date: Some(Utc::now()),
            deleted: false,
            change_type: ChangeType::Sync,
        }
    }

    /// Marks the object as freshly round-tripped at `version`
    pub fn note_sync(&mut self, version: i32) {
        self.version = version;
        self.sync_state = SyncState::Synced;
        self.sync_retries = 0;
        self.last_sync_date = Some(Utc::now());
        self.change_type = ChangeType::Sync;
    }
}

/// Returns the union of field groups covered by pending deltas
pub fn changed_fields<F: Copy + PartialEq>(changes: &[ObjectChange<F>]) -> Vec<F> {
    let mut union = Vec::new();
    for change in changes {
        for field in &change.fields {
            if !union.contains(field) {
                union.push(*field);
            }
        }
    }
    union
}

/// Removes exactly the deltas named by `identifiers`; later-appended deltas
/// survive
pub fn delete_changes_by_id<F>(changes: &mut Vec<ObjectChange<F>>, identifiers: &[Uuid]) {
    changes.retain(|change| !identifiers.contains(&change.identifier));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum TestField {
        A,
        B,
    }

    #[test]
    fn test_changed_fields_union() {
        let changes = vec![
            ObjectChange::new(vec![TestField::A]),
            ObjectChange::new(vec![TestField::A, TestField::B]),
        ];
        let union = changed_fields(&changes);
        assert_eq!(union, vec![TestField::A, TestField::B]);
    }

    #[test]
    fn test_delete_changes_exact_subset() {
        let first = ObjectChange::new(vec![TestField::A]);
        let second = ObjectChange::new(vec![TestField::B]);
        let mut changes = vec![first.clone(), second.clone()];

        delete_changes_by_id(&mut changes, &[first.identifier]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].identifier, second.identifier);
    }

    #[test]
    fn test_delete_changes_ignores_unknown_ids() {
        let mut changes = vec![ObjectChange::new(vec![TestField::A])];
        delete_changes_by_id(&mut changes, &[Uuid::new_v4()]);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_note_sync_resets_retries() {
        let mut meta = SyncMeta::new_user();
        meta.sync_retries = 3;
        meta.note_sync(10);
        assert_eq!(meta.version, 10);
        assert_eq!(meta.sync_retries, 0);
        assert_eq!(meta.sync_state, SyncState::Synced);
        assert!(meta.last_sync_date.is_some());
    }
}
