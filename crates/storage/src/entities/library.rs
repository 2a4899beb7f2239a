// crates/storage/src/entities/library.rs
//! Custom-library record and per-kind version anchors

use citestream_core::{CustomLibraryType, SyncObjectKind};
use serde::{Deserialize, Serialize};

/// Last-known server version per entity kind within one library.
///
/// Stored per library and used to ask the service "what changed since"
/// cheaply before any object payloads move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub collections: i32,
    pub items: i32,
    pub searches: i32,
    pub trash: i32,
    pub deletions: i32,
    pub settings: i32,
}

impl Versions {
    /// Highest version across all kinds
    pub fn max(&self) -> i32 {
        [
            self.collections,
            self.items,
            self.searches,
            self.trash,
            self.deletions,
            self.settings,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Version anchor for one kind
    pub fn for_kind(&self, kind: SyncObjectKind) -> i32 {
        match kind {
            SyncObjectKind::Collection => self.collections,
            SyncObjectKind::Search => self.searches,
            SyncObjectKind::Item => self.items,
            SyncObjectKind::Trash => self.trash,
            SyncObjectKind::Settings => self.settings,
        }
    }

    /// Updates the anchor for one kind
    pub fn set_for_kind(&mut self, kind: SyncObjectKind, version: i32) {
        match kind {
            SyncObjectKind::Collection => self.collections = version,
            SyncObjectKind::Search => self.searches = version,
            SyncObjectKind::Item => self.items = version,
            SyncObjectKind::Trash => self.trash = version,
            SyncObjectKind::Settings => self.settings = version,
        }
    }
}

/// A personal (non-group) library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLibrary {
    /// Which personal library this is
    pub library_type: CustomLibraryType,
    /// Per-kind last-known sync versions
    pub versions: Versions,
}

impl CustomLibrary {
    /// Creates a personal library with zeroed version anchors
    pub fn new(library_type: CustomLibraryType) -> Self {
        Self {
            library_type,
            versions: Versions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_max() {
        let versions = Versions {
            collections: 3,
            items: 12,
            searches: 1,
            trash: 7,
            deletions: 2,
            settings: 0,
        };
        assert_eq!(versions.max(), 12);
    }

    #[test]
    fn test_versions_per_kind_roundtrip() {
        let mut versions = Versions::default();
        versions.set_for_kind(SyncObjectKind::Item, 42);
        assert_eq!(versions.for_kind(SyncObjectKind::Item), 42);
        assert_eq!(versions.for_kind(SyncObjectKind::Trash), 0);
    }
}
