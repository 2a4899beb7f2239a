// crates/storage/src/requests/mark_synced.rs
//! Upload acknowledgment commands
//!
//! Acknowledgment always names the exact change identifiers captured when
//! the batch was built; deltas appended between batch construction and
//! acknowledgment are left untouched.

use crate::store::Database;
use citestream_core::{LibraryId, Result, SyncObjectKind};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Acknowledges a completed write batch: sets the server-assigned version,
/// flips the change type to sync-response and deletes exactly the
/// acknowledged change-id subset per object. Objects missing locally are
/// skipped; the upload already succeeded remotely.
pub fn mark_objects_as_synced(
    db: &mut Database,
    library_id: LibraryId,
    kind: SyncObjectKind,
    keys: &[String],
    change_ids: &BTreeMap<String, Vec<Uuid>>,
    version: i32,
) -> Result<()> {
    match kind {
        SyncObjectKind::Collection => {
            for key in keys {
                if let Ok(collection) = db.collection_mut(library_id, key) {
                    collection.meta.version = version;
                    let ids = change_ids.get(key).cloned().unwrap_or_default();
                    collection.delete_changes(&ids);
                }
            }
        }
        SyncObjectKind::Search => {
            for key in keys {
                if let Ok(search) = db.search_mut(library_id, key) {
                    search.meta.version = version;
                    let ids = change_ids.get(key).cloned().unwrap_or_default();
                    search.delete_changes(&ids);
                }
            }
        }
        SyncObjectKind::Item | SyncObjectKind::Trash => {
            for key in keys {
                if let Ok(item) = db.item_mut(library_id, key) {
                    item.meta.version = version;
                    let ids = change_ids.get(key).cloned().unwrap_or_default();
                    item.delete_changes(&ids);
                }
            }
        }
        SyncObjectKind::Settings => {
            // Settings entries are keyed by their settings name.
            for key in keys {
                let object_key = key
                    .strip_prefix("lastPageIndex_")
                    .unwrap_or(key)
                    .to_string();
                if let Ok(page) = db.page_index_mut(library_id, &object_key) {
                    page.meta.version = version;
                    let ids = change_ids.get(key).cloned().unwrap_or_default();
                    page.delete_changes(&ids);
                }
            }
        }
    }
    Ok(())
}

/// Acknowledges a completed delete batch by purging the tombstones
pub fn mark_deletions_as_synced(
    db: &mut Database,
    library_id: LibraryId,
    kind: SyncObjectKind,
    keys: &[String],
) -> Result<()> {
    match kind {
        SyncObjectKind::Collection => {
            for key in keys {
                db.collections.remove(&(library_id, key.clone()));
            }
        }
        SyncObjectKind::Search => {
            for key in keys {
                db.searches.remove(&(library_id, key.clone()));
            }
        }
        SyncObjectKind::Item | SyncObjectKind::Trash => {
            for key in keys {
                super::items::remove_item_cascading(db, library_id, key);
            }
            db.prune_orphaned_tags(library_id);
        }
        SyncObjectKind::Settings => {}
    }
    Ok(())
}
