// crates/storage/src/requests/mark_changed.rs
//! Change-tracking commands: re-marking objects dirty after conflict
//! restores and full-sync reconciliation.

use crate::entities::{ChangeType, ItemChange, ObjectChange};
use crate::store::Database;
use citestream_core::{LibraryId, Result, SyncObjectKind};
use std::collections::BTreeMap;

/// Marks an item and all its descendants as changed by the user.
/// Cycle-safe: a parent loop is walked once and abandoned.
pub fn mark_item_as_changed(db: &mut Database, library_id: LibraryId, key: &str) -> Result<()> {
    db.item(library_id, key)?;
    let mut pending = vec![key.to_string()];
    let mut visited = std::collections::BTreeSet::new();

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        pending.extend(db.child_item_keys(library_id, &current));
        if let Ok(item) = db.item_mut(library_id, &current) {
            item.mark_as_changed_local();
        }
    }
    Ok(())
}

/// Marks a collection subtree as changed by the user. Items contained in
/// each collection record a membership delta so the assignment is
/// re-uploaded along with the collection itself.
pub fn mark_collection_as_changed(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
) -> Result<()> {
    db.collection(library_id, key)?;
    let mut pending = vec![key.to_string()];
    let mut visited = std::collections::BTreeSet::new();

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        pending.extend(db.child_collection_keys(library_id, &current));

        if let Ok(collection) = db.collection_mut(library_id, &current) {
            collection.mark_as_changed_local();
        }
        for item_key in db.collection_item_keys(library_id, &current) {
            if let Ok(item) = db.item_mut(library_id, &item_key) {
                item.changes
                    .push(ObjectChange::new(vec![ItemChange::Collections]));
                item.meta.change_type = ChangeType::User;
            }
        }
    }
    Ok(())
}

/// Re-marks the given collections and items dirty; used by the
/// restore-conflicts deletion policy and by explicit user restores
pub fn mark_objects_as_changed(
    db: &mut Database,
    library_id: LibraryId,
    collections: &[String],
    items: &[String],
) -> Result<()> {
    for key in collections {
        if db.collection(library_id, key).is_ok() {
            mark_collection_as_changed(db, library_id, key)?;
        }
    }
    for key in items {
        if db.item(library_id, key).is_ok() {
            mark_item_as_changed(db, library_id, key)?;
        }
    }
    Ok(())
}

/// Full-sync reconciliation: objects the server's version map no longer
/// mentions are either purged (when tombstoned locally) or re-marked
/// dirty so the next upload restores them remotely. Only objects that
/// believe themselves synced are touched.
pub fn mark_other_objects_as_changed(
    db: &mut Database,
    kind: SyncObjectKind,
    library_id: LibraryId,
    versions: &BTreeMap<String, i32>,
) -> Result<()> {
    use crate::entities::SyncState;

    match kind {
        SyncObjectKind::Collection => {
            let keys: Vec<(String, bool)> = db
                .collections_in_library(library_id)
                .filter(|c| c.meta.sync_state == SyncState::Synced && !versions.contains_key(&c.key))
                .map(|c| (c.key.clone(), c.meta.deleted))
                .collect();
            for (key, deleted) in keys {
                if deleted {
                    log::warn!("full sync: locally deleted collection {key} missing remotely, purging");
                    db.collections.remove(&(library_id, key));
                } else {
                    log::warn!("full sync: marking collection {key} as changed");
                    mark_collection_as_changed(db, library_id, &key)?;
                }
            }
        }
        SyncObjectKind::Search => {
            let keys: Vec<(String, bool)> = db
                .searches_in_library(library_id)
                .filter(|s| s.meta.sync_state == SyncState::Synced && !versions.contains_key(&s.key))
                .map(|s| (s.key.clone(), s.meta.deleted))
                .collect();
            for (key, deleted) in keys {
                if deleted {
                    log::warn!("full sync: locally deleted search {key} missing remotely, purging");
                    db.searches.remove(&(library_id, key));
                } else {
                    log::warn!("full sync: marking search {key} as changed");
                    let search = db.search_mut(library_id, &key)?;
                    search.mark_as_changed_local();
                }
            }
        }
        SyncObjectKind::Item | SyncObjectKind::Trash => {
            let in_trash = kind == SyncObjectKind::Trash;
            let keys: Vec<(String, bool)> = db
                .items_in_library(library_id)
                .filter(|i| {
                    i.trash == in_trash
                        && i.meta.sync_state == SyncState::Synced
                        && !versions.contains_key(&i.key)
                })
                .map(|i| (i.key.clone(), i.meta.deleted))
                .collect();
            for (key, deleted) in keys {
                if deleted {
                    log::warn!("full sync: locally deleted item {key} missing remotely, purging");
                    super::items::remove_item_cascading(db, library_id, &key);
                } else {
                    log::warn!("full sync: marking item {key} as changed");
                    mark_item_as_changed(db, library_id, &key)?;
                }
            }
            db.prune_orphaned_tags(library_id);
        }
        SyncObjectKind::Settings => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Collection, Item};
    use citestream_core::CustomLibraryType;

    fn test_library() -> LibraryId {
        LibraryId::Custom(CustomLibraryType::MyLibrary)
    }

    fn synced_item(key: &str, raw_type: &str, version: i32) -> Item {
        let mut item = Item::new(key, test_library(), raw_type);
        item.meta = crate::entities::SyncMeta::new_synced(version);
        item
    }

    #[test]
    fn test_mark_item_recurses_into_children() {
        let mut db = Database::default();
        db.insert_item(synced_item("PARENT23", "book", 4)).expect("parent");
        let mut child = synced_item("CHILD234", "note", 4);
        child.parent_key = Some("PARENT23".to_string());
        db.insert_item(child).expect("child");

        mark_item_as_changed(&mut db, test_library(), "PARENT23").expect("mark");
        assert!(db.item(test_library(), "PARENT23").expect("p").is_changed());
        assert!(db.item(test_library(), "CHILD234").expect("c").is_changed());
    }

    #[test]
    fn test_mark_item_survives_parent_cycle() {
        let mut db = Database::default();
        let mut a = synced_item("AAAA2345", "book", 1);
        a.parent_key = Some("BBBB2345".to_string());
        let mut b = synced_item("BBBB2345", "book", 1);
        b.parent_key = Some("AAAA2345".to_string());
        db.insert_item(a).expect("a");
        db.insert_item(b).expect("b");

        mark_item_as_changed(&mut db, test_library(), "AAAA2345").expect("mark");
        assert!(db.item(test_library(), "AAAA2345").expect("a").is_changed());
        assert!(db.item(test_library(), "BBBB2345").expect("b").is_changed());
    }

    #[test]
    fn test_mark_collection_touches_contained_items() {
        let mut db = Database::default();
        let mut collection = Collection::new("COLL2345", test_library(), "Papers");
        collection.delete_all_changes();
        db.insert_collection(collection).expect("collection");
        let mut item = synced_item("AAAA2345", "book", 2);
        item.collection_keys.insert("COLL2345".to_string());
        db.insert_item(item).expect("item");

        mark_collection_as_changed(&mut db, test_library(), "COLL2345").expect("mark");
        let item = db.item(test_library(), "AAAA2345").expect("item");
        assert!(item.changed_fields().contains(&ItemChange::Collections));
        assert_eq!(item.meta.change_type, ChangeType::User);
    }

    #[test]
    fn test_full_sync_restores_missing_and_purges_tombstones() {
        let mut db = Database::default();
        db.insert_item(synced_item("KEEP2345", "book", 5)).expect("kept");
        db.insert_item(synced_item("GONE2345", "book", 5)).expect("gone");
        let mut tombstoned = synced_item("DEAD2345", "book", 5);
        tombstoned.meta.deleted = true;
        db.insert_item(tombstoned).expect("dead");

        let mut versions = BTreeMap::new();
        versions.insert("KEEP2345".to_string(), 5);

        mark_other_objects_as_changed(&mut db, SyncObjectKind::Item, test_library(), &versions)
            .expect("reconcile");

        assert!(!db.item(test_library(), "KEEP2345").expect("kept").is_changed());
        assert!(db.item(test_library(), "GONE2345").expect("gone").is_changed());
        assert!(db.item(test_library(), "DEAD2345").is_err());
    }
}
