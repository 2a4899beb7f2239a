// crates/storage/src/requests/deletions.rs
//! Remote-deletion application and local tombstoning

use crate::entities::SyncState;
use crate::store::Database;
use citestream_core::{LibraryId, Result, SyncObjectKind};

/// Policy applied when a server-deleted object has unacknowledged local
/// changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictMode {
    /// Report `(key, title)` as a conflict, keep the local copy
    ResolveConflicts,
    /// Delete unconditionally, discarding local edits
    DeleteConflicts,
    /// Re-mark the object dirty instead of deleting; local wins
    RestoreConflicts,
}

/// Server-reported deletions for one library
#[derive(Debug, Clone, Default)]
pub struct Deletions {
    pub collections: Vec<String>,
    pub items: Vec<String>,
    pub searches: Vec<String>,
    pub tags: Vec<String>,
}

/// Applies server-reported deletions under the given conflict policy.
/// Returns the `(key, title)` conflicts left unresolved; non-empty only
/// under [`ConflictMode::ResolveConflicts`].
pub fn perform_deletions(
    db: &mut Database,
    library_id: LibraryId,
    deletions: &Deletions,
    mode: ConflictMode,
) -> Result<Vec<(String, String)>> {
    let mut conflicts = Vec::new();
    delete_collections(db, library_id, &deletions.collections, mode, &mut conflicts)?;
    delete_searches(db, library_id, &deletions.searches, mode, &mut conflicts)?;
    delete_items(db, library_id, &deletions.items, mode, &mut conflicts)?;
    delete_tags(db, library_id, &deletions.tags);
    Ok(conflicts)
}

fn delete_items(
    db: &mut Database,
    library_id: LibraryId,
    keys: &[String],
    mode: ConflictMode,
    conflicts: &mut Vec<(String, String)>,
) -> Result<()> {
    for key in keys {
        let Ok(item) = db.item(library_id, key) else {
            continue;
        };
        let title = item.display_title.clone();

        if super::items::self_or_child_changed(db, library_id, key) {
            match mode {
                ConflictMode::ResolveConflicts => {
                    conflicts.push((key.clone(), title));
                    continue;
                }
                ConflictMode::RestoreConflicts => {
                    super::mark_changed::mark_item_as_changed(db, library_id, key)?;
                    continue;
                }
                ConflictMode::DeleteConflicts => {}
            }
        }
        super::items::remove_item_cascading(db, library_id, key);
    }
    db.prune_orphaned_tags(library_id);
    Ok(())
}

fn delete_collections(
    db: &mut Database,
    library_id: LibraryId,
    keys: &[String],
    mode: ConflictMode,
    conflicts: &mut Vec<(String, String)>,
) -> Result<()> {
    for key in keys {
        let Ok(collection) = db.collection(library_id, key) else {
            continue;
        };
        let name = collection.name.clone();

        if collection.is_changed() {
            match mode {
                ConflictMode::ResolveConflicts => {
                    conflicts.push((key.clone(), name));
                    continue;
                }
                ConflictMode::RestoreConflicts => {
                    super::mark_changed::mark_collection_as_changed(db, library_id, key)?;
                    continue;
                }
                ConflictMode::DeleteConflicts => {}
            }
        }
        super::collections::remove_collection_cascading(db, library_id, key);
    }
    Ok(())
}

fn delete_searches(
    db: &mut Database,
    library_id: LibraryId,
    keys: &[String],
    mode: ConflictMode,
    conflicts: &mut Vec<(String, String)>,
) -> Result<()> {
    for key in keys {
        let Ok(search) = db.search(library_id, key) else {
            continue;
        };
        let name = search.name.clone();

        if search.is_changed() {
            match mode {
                ConflictMode::ResolveConflicts => {
                    conflicts.push((key.clone(), name));
                    continue;
                }
                ConflictMode::RestoreConflicts => {
                    db.search_mut(library_id, key)?.mark_as_changed_local();
                    continue;
                }
                ConflictMode::DeleteConflicts => {}
            }
        }
        db.searches.remove(&(library_id, key.clone()));
    }
    Ok(())
}

fn delete_tags(db: &mut Database, library_id: LibraryId, names: &[String]) {
    for name in names {
        db.typed_tags
            .retain(|tt| !(tt.library_id == library_id && &tt.tag_name == name));
        db.tags.remove(&(library_id, name.clone()));
    }
}

/// Tombstones locally-deleted objects so the next upload round reports
/// them remotely; never-synced objects are removed outright since the
/// server has never seen them
pub fn mark_objects_as_deleted(
    db: &mut Database,
    library_id: LibraryId,
    kind: SyncObjectKind,
    keys: &[String],
) -> Result<()> {
    match kind {
        SyncObjectKind::Collection => {
            for key in keys {
                let Ok(collection) = db.collection_mut(library_id, key) else {
                    continue;
                };
                if collection.meta.version == 0 {
                    db.collections.remove(&(library_id, key.clone()));
                } else {
                    collection.meta.deleted = true;
                    collection.delete_all_changes();
                }
            }
        }
        SyncObjectKind::Search => {
            for key in keys {
                let Ok(search) = db.search_mut(library_id, key) else {
                    continue;
                };
                if search.meta.version == 0 {
                    db.searches.remove(&(library_id, key.clone()));
                } else {
                    search.meta.deleted = true;
                    search.delete_all_changes();
                }
            }
        }
        SyncObjectKind::Item | SyncObjectKind::Trash => {
            for key in keys {
                let Ok(item) = db.item_mut(library_id, key) else {
                    continue;
                };
                if item.meta.version == 0 {
                    super::items::remove_item_cascading(db, library_id, key);
                } else {
                    item.meta.deleted = true;
                    item.delete_all_changes();
                }
            }
            db.prune_orphaned_tags(library_id);
        }
        SyncObjectKind::Settings => {}
    }
    Ok(())
}

/// Keys of tombstoned objects of one kind, for delete-batch assembly
pub fn read_deleted_object_keys(
    db: &Database,
    library_id: LibraryId,
    kind: SyncObjectKind,
) -> Vec<String> {
    match kind {
        SyncObjectKind::Collection => db
            .collections_in_library(library_id)
            .filter(|c| c.meta.deleted)
            .map(|c| c.key.clone())
            .collect(),
        SyncObjectKind::Search => db
            .searches_in_library(library_id)
            .filter(|s| s.meta.deleted)
            .map(|s| s.key.clone())
            .collect(),
        SyncObjectKind::Item | SyncObjectKind::Trash => db
            .items_in_library(library_id)
            .filter(|i| i.meta.deleted)
            .map(|i| i.key.clone())
            .collect(),
        SyncObjectKind::Settings => Vec::new(),
    }
}

/// Objects marked outdated that still need a re-fetch
pub fn read_outdated_keys(db: &Database, library_id: LibraryId, kind: SyncObjectKind) -> Vec<String> {
    match kind {
        SyncObjectKind::Collection => db
            .collections_in_library(library_id)
            .filter(|c| c.meta.sync_state == SyncState::Outdated)
            .map(|c| c.key.clone())
            .collect(),
        SyncObjectKind::Search => db
            .searches_in_library(library_id)
            .filter(|s| s.meta.sync_state == SyncState::Outdated)
            .map(|s| s.key.clone())
            .collect(),
        SyncObjectKind::Item | SyncObjectKind::Trash => db
            .items_in_library(library_id)
            .filter(|i| i.meta.sync_state == SyncState::Outdated)
            .map(|i| i.key.clone())
            .collect(),
        SyncObjectKind::Settings => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Item;
    use citestream_core::CustomLibraryType;

    fn test_library() -> LibraryId {
        LibraryId::Custom(CustomLibraryType::MyLibrary)
    }

    fn changed_item(key: &str, title: &str) -> Item {
        let mut item = Item::new(key, test_library(), "book");
        item.set_title(title);
        item.mark_as_changed_local();
        item
    }

    fn synced_item(key: &str) -> Item {
        let mut item = Item::new(key, test_library(), "book");
        item.meta = crate::entities::SyncMeta::new_synced(3);
        item
    }

    #[test]
    fn test_resolve_conflicts_keeps_changed_item() {
        let mut db = Database::default();
        db.insert_item(changed_item("AAAA2345", "Dune")).expect("insert");

        let deletions = Deletions {
            items: vec!["AAAA2345".to_string()],
            ..Deletions::default()
        };
        let conflicts =
            perform_deletions(&mut db, test_library(), &deletions, ConflictMode::ResolveConflicts)
                .expect("deletions");

        assert_eq!(conflicts, vec![("AAAA2345".to_string(), "Dune".to_string())]);
        assert!(db.item(test_library(), "AAAA2345").is_ok());
    }

    #[test]
    fn test_delete_conflicts_discards_local_edits() {
        let mut db = Database::default();
        db.insert_item(changed_item("AAAA2345", "Dune")).expect("insert");

        let deletions = Deletions {
            items: vec!["AAAA2345".to_string()],
            ..Deletions::default()
        };
        let conflicts =
            perform_deletions(&mut db, test_library(), &deletions, ConflictMode::DeleteConflicts)
                .expect("deletions");

        assert!(conflicts.is_empty());
        assert!(db.item(test_library(), "AAAA2345").is_err());
    }

    #[test]
    fn test_restore_conflicts_remarks_dirty() {
        let mut db = Database::default();
        db.insert_item(changed_item("AAAA2345", "Dune")).expect("insert");

        let deletions = Deletions {
            items: vec!["AAAA2345".to_string()],
            ..Deletions::default()
        };
        let conflicts =
            perform_deletions(&mut db, test_library(), &deletions, ConflictMode::RestoreConflicts)
                .expect("deletions");

        assert!(conflicts.is_empty());
        let item = db.item(test_library(), "AAAA2345").expect("item");
        assert!(item.is_changed());
        assert_eq!(item.meta.version, 0);
    }

    #[test]
    fn test_unchanged_item_deleted_outright() {
        let mut db = Database::default();
        db.insert_item(synced_item("AAAA2345")).expect("insert");

        let deletions = Deletions {
            items: vec!["AAAA2345".to_string()],
            ..Deletions::default()
        };
        let conflicts =
            perform_deletions(&mut db, test_library(), &deletions, ConflictMode::ResolveConflicts)
                .expect("deletions");

        assert!(conflicts.is_empty());
        assert!(db.item(test_library(), "AAAA2345").is_err());
    }

    #[test]
    fn test_child_change_protects_parent() {
        let mut db = Database::default();
        db.insert_item(synced_item("PARENT23")).expect("parent");
        let mut child = changed_item("CHILD234", "Notes");
        child.parent_key = Some("PARENT23".to_string());
        db.insert_item(child).expect("child");

        let deletions = Deletions {
            items: vec!["PARENT23".to_string()],
            ..Deletions::default()
        };
        let conflicts =
            perform_deletions(&mut db, test_library(), &deletions, ConflictMode::ResolveConflicts)
                .expect("deletions");

        assert_eq!(conflicts.len(), 1);
        assert!(db.item(test_library(), "PARENT23").is_ok());
        assert!(db.item(test_library(), "CHILD234").is_ok());
    }

    #[test]
    fn test_tag_deletion_cascades_joins() {
        use crate::entities::{Tag, TagKind, TypedTag};

        let mut db = Database::default();
        db.insert_item(synced_item("AAAA2345")).expect("item");
        db.tags.insert(
            (test_library(), "old".to_string()),
            Tag::new("old", test_library()),
        );
        db.typed_tags.push(TypedTag {
            tag_name: "old".to_string(),
            item_key: "AAAA2345".to_string(),
            library_id: test_library(),
            kind: TagKind::Manual,
        });

        let deletions = Deletions {
            tags: vec!["old".to_string()],
            ..Deletions::default()
        };
        perform_deletions(&mut db, test_library(), &deletions, ConflictMode::ResolveConflicts)
            .expect("deletions");

        assert!(db.typed_tags.is_empty());
        assert!(!db.tags.contains_key(&(test_library(), "old".to_string())));
    }

    #[test]
    fn test_tombstoning_never_synced_object_removes_it() {
        let mut db = Database::default();
        db.insert_item(changed_item("AAAA2345", "Local only")).expect("insert");

        mark_objects_as_deleted(
            &mut db,
            test_library(),
            SyncObjectKind::Item,
            &["AAAA2345".to_string()],
        )
        .expect("tombstone");
        assert!(db.item(test_library(), "AAAA2345").is_err());
    }

    #[test]
    fn test_tombstoned_key_reported_for_delete_batch() {
        let mut db = Database::default();
        db.insert_item(synced_item("AAAA2345")).expect("insert");

        mark_objects_as_deleted(
            &mut db,
            test_library(),
            SyncObjectKind::Item,
            &["AAAA2345".to_string()],
        )
        .expect("tombstone");

        let item = db.item(test_library(), "AAAA2345").expect("item");
        assert!(item.meta.deleted);
        assert!(!item.is_changed());
        assert_eq!(
            read_deleted_object_keys(&db, test_library(), SyncObjectKind::Item),
            vec!["AAAA2345".to_string()]
        );
    }
}
