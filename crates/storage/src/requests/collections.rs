// crates/storage/src/requests/collections.rs
//! Collection commands: creation, renaming, reparenting, membership edits
//! and deletion with subtree cascade.

use crate::entities::{ChangeType, Collection, CollectionChange, ItemChange, ObjectChange};
use crate::store::Database;
use citestream_core::{LibraryId, Result};

/// Creates a new collection and records its initial change set
pub fn create_collection(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    name: &str,
    parent_key: Option<&str>,
) -> Result<()> {
    if let Some(parent) = parent_key {
        db.collection(library_id, parent)?;
    }
    let mut collection = Collection::new(key, library_id, name);
    collection.parent_key = parent_key.map(str::to_string);
    collection.mark_as_changed_local();
    db.insert_collection(collection)
}

/// Renames a collection, recording a name delta
pub fn rename_collection(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    name: &str,
) -> Result<()> {
    let collection = db.collection_mut(library_id, key)?;
    collection.name = name.to_string();
    collection
        .changes
        .push(ObjectChange::new(vec![CollectionChange::Name]));
    collection.meta.change_type = ChangeType::User;
    Ok(())
}

/// Reassigns a collection's parent, recording a parent delta
pub fn set_collection_parent(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    parent_key: Option<&str>,
) -> Result<()> {
    if let Some(parent) = parent_key {
        db.collection(library_id, parent)?;
    }
    let collection = db.collection_mut(library_id, key)?;
    collection.parent_key = parent_key.map(str::to_string);
    collection
        .changes
        .push(ObjectChange::new(vec![CollectionChange::Parent]));
    collection.meta.change_type = ChangeType::User;
    Ok(())
}

/// Adds items to a collection; each touched item records a collections
/// delta
pub fn add_items_to_collection(
    db: &mut Database,
    library_id: LibraryId,
    collection_key: &str,
    item_keys: &[String],
) -> Result<()> {
    db.collection(library_id, collection_key)?;
    for key in item_keys {
        let item = db.item_mut(library_id, key)?;
        if item.collection_keys.insert(collection_key.to_string()) {
            item.changes
                .push(ObjectChange::new(vec![ItemChange::Collections]));
            item.meta.change_type = ChangeType::User;
        }
    }
    Ok(())
}

/// Removes items from a collection; each touched item records a
/// collections delta
pub fn remove_items_from_collection(
    db: &mut Database,
    library_id: LibraryId,
    collection_key: &str,
    item_keys: &[String],
) -> Result<()> {
    for key in item_keys {
        let item = db.item_mut(library_id, key)?;
        if item.collection_keys.remove(collection_key) {
            item.changes
                .push(ObjectChange::new(vec![ItemChange::Collections]));
            item.meta.change_type = ChangeType::User;
        }
    }
    Ok(())
}

/// Deletes a collection outright together with its descendant
/// collections; contained items lose the membership and record a delta
pub fn delete_collection(db: &mut Database, library_id: LibraryId, key: &str) -> Result<()> {
    db.collection(library_id, key)?;
    remove_collection_cascading(db, library_id, key);
    Ok(())
}

/// Removes a collection subtree, scrubbing memberships off contained items
pub fn remove_collection_cascading(db: &mut Database, library_id: LibraryId, key: &str) {
    // Visited set guards against parent cycles in corrupted data.
    let mut pending = vec![key.to_string()];
    let mut visited = std::collections::BTreeSet::new();

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        pending.extend(db.child_collection_keys(library_id, &current));
        for item_key in db.collection_item_keys(library_id, &current) {
            if let Ok(item) = db.item_mut(library_id, &item_key) {
                item.collection_keys.remove(&current);
            }
        }
        db.collections.remove(&(library_id, current));
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

    #[test]
    fn test_create_collection_under_parent() {
        let mut db = Database::default();
        create_collection(&mut db, test_library(), "ROOT2345", "Root", None).expect("root");
        create_collection(&mut db, test_library(), "CHILD234", "Child", Some("ROOT2345"))
            .expect("child");

        let child = db.collection(test_library(), "CHILD234").expect("child");
        assert_eq!(child.parent_key.as_deref(), Some("ROOT2345"));
        assert!(child.changed_fields().contains(&CollectionChange::Parent));
    }

    #[test]
    fn test_membership_edit_records_item_delta() {
        let mut db = Database::default();
        create_collection(&mut db, test_library(), "ROOT2345", "Root", None).expect("root");
        db.insert_item(Item::new("AAAA2345", test_library(), "book"))
            .expect("item");

        add_items_to_collection(
            &mut db,
            test_library(),
            "ROOT2345",
            &["AAAA2345".to_string()],
        )
        .expect("add");
        let item = db.item(test_library(), "AAAA2345").expect("item");
        assert!(item.collection_keys.contains("ROOT2345"));
        assert!(item.changed_fields().contains(&ItemChange::Collections));

        // Adding again is a no-op, no duplicate delta.
        add_items_to_collection(
            &mut db,
            test_library(),
            "ROOT2345",
            &["AAAA2345".to_string()],
        )
        .expect("re-add");
        assert_eq!(
            db.item(test_library(), "AAAA2345").expect("item").changes.len(),
            1
        );
    }

    #[test]
    fn test_delete_collection_cascade() {
        let mut db = Database::default();
        create_collection(&mut db, test_library(), "ROOT2345", "Root", None).expect("root");
        create_collection(&mut db, test_library(), "CHILD234", "Child", Some("ROOT2345"))
            .expect("child");
        db.insert_item(Item::new("AAAA2345", test_library(), "book"))
            .expect("item");
        add_items_to_collection(
            &mut db,
            test_library(),
            "CHILD234",
            &["AAAA2345".to_string()],
        )
        .expect("add");

        delete_collection(&mut db, test_library(), "ROOT2345").expect("delete");
        assert!(db.collection(test_library(), "ROOT2345").is_err());
        assert!(db.collection(test_library(), "CHILD234").is_err());
        assert!(db
            .item(test_library(), "AAAA2345")
            .expect("item")
            .collection_keys
            .is_empty());
    }
}
