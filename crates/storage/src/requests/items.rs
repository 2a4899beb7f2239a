// crates/storage/src/requests/items.rs
//! Item commands: creation with schema-checked creators, field edits,
//! parenting, trash, tags, and direct deletion with cascade.

use crate::entities::{
    item_types, Item, ItemChange, ItemField, ObjectChange, Tag, TagKind, TypedTag,
};
use crate::schema::Schema;
use crate::store::Database;
use citestream_core::{DataError, LibraryId, Result};

/// Creates a new item and records its initial change set.
///
/// Creators are validated against the schema. Under `strict` an invalid
/// creator type aborts the creation; otherwise it is coerced to the item
/// type's primary creator (or the first valid one) with a logged warning.
pub fn create_item(db: &mut Database, schema: &Schema, mut item: Item, strict: bool) -> Result<()> {
    if item_types::supports_creators(&item.raw_type) && !item.creators.is_empty() {
        apply_creator_schema(schema, &mut item, strict)?;
    } else if !item_types::supports_creators(&item.raw_type) {
        item.creators.clear();
    }

    if let Some(parent_key) = item.parent_key.clone() {
        db.item(item.library_id, &parent_key)?;
    }

    item.update_derived_titles();
    item.mark_as_changed_local();
    db.insert_item(item)
}

/// Validates the item's creators against the schema, coercing invalid
/// creator types when `strict` is false
pub fn apply_creator_schema(schema: &Schema, item: &mut Item, strict: bool) -> Result<()> {
    let valid = match schema.creators(&item.raw_type) {
        Some(creators) if !creators.is_empty() => creators.to_vec(),
        _ => {
            return Err(DataError::NoValidCreators {
                item_key: item.key.clone(),
                item_type: item.raw_type.clone(),
            })
        }
    };

    for creator in &mut item.creators {
        if !valid.iter().any(|c| c.creator_type == creator.creator_type) {
            if strict {
                return Err(DataError::InvalidCreator {
                    item_key: item.key.clone(),
                    creator_type: creator.creator_type.clone(),
                });
            }
            let replacement = valid
                .iter()
                .find(|c| c.primary)
                .unwrap_or(&valid[0])
                .creator_type
                .clone();
            log::warn!(
                "creator type '{}' isn't valid for {}; coercing to '{}'",
                creator.creator_type,
                item.raw_type,
                replacement
            );
            creator.creator_type = replacement;
        }
        creator.primary = schema.creator_is_primary(&item.raw_type, &creator.creator_type);
    }
    Ok(())
}

/// Sets one field value, recording a fields delta
pub fn edit_item_field(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    field_key: &str,
    value: &str,
) -> Result<()> {
    let item = db.item_mut(library_id, key)?;

    match item.fields.iter_mut().find(|f| f.key == field_key) {
        Some(field) => {
            field.value = value.to_string();
            field.changed = true;
        }
        None => {
            let mut field = ItemField::new(field_key, value);
            field.changed = true;
            item.fields.push(field);
        }
    }

    if field_key == crate::entities::field_keys::TITLE {
        item.set_title(value);
    }

    item.changes
        .push(ObjectChange::new(vec![ItemChange::Fields]));
    item.meta.change_type = crate::entities::ChangeType::User;
    Ok(())
}

/// Reassigns the item's parent, recording a parent delta
pub fn set_item_parent(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    parent_key: Option<&str>,
) -> Result<()> {
    if let Some(parent) = parent_key {
        db.item(library_id, parent)?;
    }
    let item = db.item_mut(library_id, key)?;
    item.parent_key = parent_key.map(str::to_string);
    item.changes
        .push(ObjectChange::new(vec![ItemChange::Parent]));
    item.meta.change_type = crate::entities::ChangeType::User;
    Ok(())
}

/// Moves items into or out of the trash, recording trash deltas
pub fn set_items_trashed(
    db: &mut Database,
    library_id: LibraryId,
    keys: &[String],
    trashed: bool,
) -> Result<()> {
    for key in keys {
        let item = db.item_mut(library_id, key)?;
        item.trash = trashed;
        item.changes
            .push(ObjectChange::new(vec![ItemChange::Trash]));
        item.meta.change_type = crate::entities::ChangeType::User;
    }
    Ok(())
}

/// Replaces the item's tag assignments, creating missing tags and
/// recording a tags delta
pub fn set_item_tags(
    db: &mut Database,
    library_id: LibraryId,
    key: &str,
    names: &[String],
    kind: TagKind,
) -> Result<()> {
    db.item(library_id, key)?;
    db.remove_item_tag_links(library_id, key);

    for name in names {
        let tag_key = (library_id, name.clone());
        db.tags
            .entry(tag_key)
            .or_insert_with(|| Tag::new(name.clone(), library_id));
        db.typed_tags.push(TypedTag {
            tag_name: name.clone(),
            item_key: key.to_string(),
            library_id,
            kind,
        });
    }
    db.prune_orphaned_tags(library_id);

    let item = db.item_mut(library_id, key)?;
    item.changes.push(ObjectChange::new(vec![ItemChange::Tags]));
    item.meta.change_type = crate::entities::ChangeType::User;
    Ok(())
}

/// Deletes an item outright: children first, then tag joins, then the
/// item itself, followed by orphaned-tag cleanup. Used for never-synced
/// local items and as the cascade step of remote deletions.
pub fn delete_item(db: &mut Database, library_id: LibraryId, key: &str) -> Result<()> {
    db.item(library_id, key)?;
    remove_item_cascading(db, library_id, key);
    db.prune_orphaned_tags(library_id);
    Ok(())
}

/// Removes an item and its descendants without tag cleanup; the caller is
/// expected to prune orphans once per transaction
pub fn remove_item_cascading(db: &mut Database, library_id: LibraryId, key: &str) {
    // Visited set guards against parent cycles in corrupted data.
    let mut pending = vec![key.to_string()];
    let mut visited = std::collections::BTreeSet::new();

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        pending.extend(db.child_item_keys(library_id, &current));
        db.remove_item_tag_links(library_id, &current);
        db.items.remove(&(library_id, current));
    }
}

/// True when the item or any descendant has unacknowledged changes
pub fn self_or_child_changed(db: &Database, library_id: LibraryId, key: &str) -> bool {
    let mut pending = vec![key.to_string()];
    let mut visited = std::collections::BTreeSet::new();

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Ok(item) = db.item(library_id, &current) {
            if item.is_changed() {
                return true;
            }
        }
        pending.extend(db.child_item_keys(library_id, &current));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{field_keys, Creator};
    use citestream_core::{CustomLibraryType, KeyGenerator};

    fn test_library() -> LibraryId {
        LibraryId::Custom(CustomLibraryType::MyLibrary)
    }

    fn creator(creator_type: &str) -> Creator {
        Creator {
            creator_type: creator_type.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            name: String::new(),
            order_id: 0,
            primary: false,
        }
    }

    #[test]
    fn test_create_item_marks_changed() {
        let mut db = Database::default();
        let schema = Schema::bundled();
        let item = Item::new("AAAA2345", test_library(), "book");
        create_item(&mut db, &schema, item, true).expect("create");

        let stored = db.item(test_library(), "AAAA2345").expect("stored");
        assert!(stored.is_changed());
        assert_eq!(stored.meta.version, 0);
    }

    #[test]
    fn test_create_item_rejects_invalid_creator_strict() {
        let mut db = Database::default();
        let schema = Schema::bundled();
        let mut item = Item::new("AAAA2345", test_library(), "book");
        item.creators.push(creator("composer"));

        let err = create_item(&mut db, &schema, item, true).expect_err("invalid creator");
        assert!(matches!(err, DataError::InvalidCreator { .. }));
        assert!(db.item(test_library(), "AAAA2345").is_err());
    }

    #[test]
    fn test_create_item_coerces_invalid_creator_lenient() {
        let mut db = Database::default();
        let schema = Schema::bundled();
        let mut item = Item::new("AAAA2345", test_library(), "book");
        item.creators.push(creator("composer"));

        create_item(&mut db, &schema, item, false).expect("create");
        let stored = db.item(test_library(), "AAAA2345").expect("stored");
        assert_eq!(stored.creators[0].creator_type, "author");
        assert!(stored.creators[0].primary);
    }

    #[test]
    fn test_edit_title_updates_display_title() {
        let mut db = Database::default();
        let schema = Schema::bundled();
        create_item(
            &mut db,
            &schema,
            Item::new("AAAA2345", test_library(), "book"),
            true,
        )
        .expect("create");

        edit_item_field(&mut db, test_library(), "AAAA2345", field_keys::TITLE, "Dune")
            .expect("edit");
        let stored = db.item(test_library(), "AAAA2345").expect("stored");
        assert_eq!(stored.display_title, "Dune");
        assert!(stored.changed_fields().contains(&ItemChange::Fields));
    }

    #[test]
    fn test_set_parent_requires_existing_parent() {
        let mut db = Database::default();
        let schema = Schema::bundled();
        create_item(
            &mut db,
            &schema,
            Item::new("CHILD234", test_library(), "note"),
            true,
        )
        .expect("create");

        let err = set_item_parent(&mut db, test_library(), "CHILD234", Some("MISSING2"))
            .expect_err("missing parent");
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    #[test]
    fn test_delete_item_cascades_children_and_tags() {
        let mut db = Database::default();
        let schema = Schema::bundled();
        create_item(
            &mut db,
            &schema,
            Item::new("PARENT23", test_library(), "book"),
            true,
        )
        .expect("create parent");
        let mut child = Item::new("CHILD234", test_library(), "note");
        child.parent_key = Some("PARENT23".to_string());
        create_item(&mut db, &schema, child, true).expect("create child");
        set_item_tags(
            &mut db,
            test_library(),
            "PARENT23",
            &["rust".to_string()],
            TagKind::Manual,
        )
        .expect("tags");

        delete_item(&mut db, test_library(), "PARENT23").expect("delete");
        assert!(db.item(test_library(), "PARENT23").is_err());
        assert!(db.item(test_library(), "CHILD234").is_err());
        assert!(db.typed_tags.is_empty());
        assert!(!db.tags.contains_key(&(test_library(), "rust".to_string())));
    }

    #[test]
    fn test_self_or_child_changed_sees_grandchild() {
        let mut db = Database::default();
        let mut parent = Item::new("PARENT23", test_library(), "book");
        parent.delete_all_changes();
        db.insert_item(parent).expect("parent");
        let mut child = Item::new(KeyGenerator::new_key(), test_library(), "note");
        let child_key = child.key.clone();
        child.parent_key = Some("PARENT23".to_string());
        db.insert_item(child).expect("child");

        assert!(!self_or_child_changed(&db, test_library(), "PARENT23"));
        db.item_mut(test_library(), &child_key)
            .expect("child")
            .mark_as_changed_local();
        assert!(self_or_child_changed(&db, test_library(), "PARENT23"));
    }
}
