// crates/core/src/types/mod.rs
//! Identifier types shared across the workspace

mod key;
mod library;

pub use key::KeyGenerator;
pub use library::{CustomLibraryType, LibraryId};

use serde::{Deserialize, Serialize};

/// Kind of syncable object, used wherever a command is parameterized over
/// the entity kind it touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncObjectKind {
    /// Hierarchical grouping of items
    Collection,
    /// Saved search
    Search,
    /// Bibliographic/attachment/note/annotation entity outside the trash
    Item,
    /// Item currently in the trash
    Trash,
    /// Per-library settings (reading positions)
    Settings,
}

/// How aggressively a sync pass re-fetches objects
///
/// The delay-sensitive modes honor per-object retry backoff; `Full` and
/// `IgnoreIndividualDelays` re-fetch every non-synced object regardless of
/// how recently it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Re-fetch everything, restoring locally-known objects missing remotely
    Full,
    /// Regular incremental sync
    Normal,
    /// Only collections are synced
    CollectionsOnly,
    /// Only object keys are refreshed
    KeysOnly,
    /// Incremental sync that skips per-object retry delays
    IgnoreIndividualDelays,
}

impl SyncMode {
    /// True when per-object retry backoff gates re-fetching
    pub fn respects_delays(&self) -> bool {
        matches!(
            self,
            Self::Normal | Self::CollectionsOnly | Self::KeysOnly
        )
    }
}

impl SyncObjectKind {
    /// Kinds in the order a sync pass processes them
    pub const ALL: [SyncObjectKind; 5] = [
        SyncObjectKind::Collection,
        SyncObjectKind::Search,
        SyncObjectKind::Item,
        SyncObjectKind::Trash,
        SyncObjectKind::Settings,
    ];

    /// API path segment for this kind
    pub fn api_path(&self) -> &'static str {
        match self {
            Self::Collection => "collections",
            Self::Search => "searches",
            Self::Item | Self::Trash => "items",
            Self::Settings => "settings",
        }
    }
}
