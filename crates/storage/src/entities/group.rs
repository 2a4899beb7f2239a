// crates/storage/src/entities/group.rs
//! The shared-group entity

use super::common::SyncState;
use super::library::Versions;
use serde::{Deserialize, Serialize};

/// A shared group library known locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Numeric group id assigned by the service
    pub identifier: i32,
    /// Display name
    pub name: String,
    /// Server-assigned group metadata version
    pub version: i32,
    /// Current user may edit metadata
    pub can_edit_metadata: bool,
    /// Current user may edit files
    pub can_edit_files: bool,
    /// Owner user id
    pub owner_id: i64,
    /// Local sync status of the group metadata
    pub sync_state: SyncState,
    /// Group exists only locally (left or deleted remotely)
    pub local_only: bool,
    /// Per-kind last-known sync versions
    pub versions: Versions,
}

impl Group {
    /// Creates a group freshly downloaded from the service
    pub fn new(identifier: i32, name: impl Into<String>, version: i32) -> Self {
        Self {
            identifier,
            name: name.into(),
            version,
            can_edit_metadata: true,
            can_edit_files: true,
            owner_id: 0,
            sync_state: SyncState::Synced,
            local_only: false,
            versions: Versions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group() {
        let group = Group::new(77, "Lab shared", 3);
        assert_eq!(group.identifier, 77);
        assert_eq!(group.sync_state, SyncState::Synced);
        assert!(!group.local_only);
    }
}
