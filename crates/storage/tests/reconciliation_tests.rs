// crates/storage/tests/reconciliation_tests.rs
//! Download-side reconciliation flows: ingesting server payloads over
//! local state, resolving deletion conflicts, and restoring local-only
//! objects during a full sync.

use chrono::Utc;
use citestream_core::{CustomLibraryType, DataError, LibraryId, SyncObjectKind};
use citestream_storage::entities::{Item, SyncMeta, TagKind};
use citestream_storage::requests::deletions::{self, ConflictMode, Deletions};
use citestream_storage::requests::store_response::{
    self, CreatorPayload, ItemPayload, TagPayload,
};
use citestream_storage::requests::{items, mark_changed};
use citestream_storage::{Schema, Store};
use std::collections::BTreeMap;

fn test_library() -> LibraryId {
    LibraryId::Custom(CustomLibraryType::MyLibrary)
}

fn payload(key: &str, version: i32) -> ItemPayload {
    let now = Utc::now();
    ItemPayload {
        key: key.to_string(),
        library_id: test_library(),
        raw_type: "book".to_string(),
        version,
        title: "Remote title".to_string(),
        trash: false,
        date_added: now,
        date_modified: now,
        parent_key: None,
        collection_keys: Vec::new(),
        fields: Vec::new(),
        creators: Vec::new(),
        relations: Vec::new(),
        tags: Vec::new(),
        rects: Vec::new(),
        paths: Vec::new(),
    }
}

#[test]
fn test_ingest_over_changed_item_reports_conflict_without_remote_preference() {
    let mut store = Store::new();
    let schema = Schema::bundled();

    store
        .write(|db| {
            let mut item = Item::new("BOOK2345", test_library(), "book");
            item.set_title("Local title");
            item.mark_as_changed_local();
            db.insert_item(item)
        })
        .expect("seed");

    let outcome = store
        .write(|db| {
            store_response::store_items(db, &schema, &[payload("BOOK2345", 8)], false, true)
        })
        .expect("ingest");

    assert_eq!(outcome.conflicts.len(), 1);
    assert!(matches!(
        outcome.conflicts[0],
        DataError::ItemChanged { .. }
    ));
    store
        .read(|db| {
            // Local state untouched until the conflict is resolved.
            let item = db.item(test_library(), "BOOK2345")?;
            assert_eq!(item.base_title, "Local title");
            assert!(item.is_changed());
            Ok(())
        })
        .expect("verify");
}

#[test]
fn test_ingest_with_remote_preference_overwrites_local_changes() {
    let mut store = Store::new();
    let schema = Schema::bundled();

    store
        .write(|db| {
            let mut item = Item::new("BOOK2345", test_library(), "book");
            item.set_title("Local title");
            item.mark_as_changed_local();
            db.insert_item(item)
        })
        .expect("seed");

    let mut remote = payload("BOOK2345", 8);
    remote.tags.push(TagPayload {
        tag: "remote-tag".to_string(),
        kind: TagKind::Manual,
    });

    let outcome = store
        .write(|db| store_response::store_items(db, &schema, &[remote.clone()], true, true))
        .expect("ingest");

    assert!(outcome.conflicts.is_empty());
    store
        .read(|db| {
            let item = db.item(test_library(), "BOOK2345")?;
            assert_eq!(item.base_title, "Remote title");
            assert_eq!(item.meta.version, 8);
            assert!(!item.is_changed());
            assert_eq!(
                db.item_tag_names(test_library(), "BOOK2345"),
                vec!["remote-tag".to_string()]
            );
            Ok(())
        })
        .expect("verify");
}

#[test]
fn test_lenient_ingest_coerces_invalid_creator() {
    let mut store = Store::new();
    let schema = Schema::bundled();

    let mut remote = payload("BOOK2345", 4);
    remote.creators.push(CreatorPayload {
        creator_type: "castMember".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        name: String::new(),
    });

    // Strict ingestion rejects the unknown creator type.
    let outcome = store
        .write(|db| store_response::store_items(db, &schema, &[remote.clone()], false, true))
        .expect("strict ingest");
    assert!(matches!(
        outcome.conflicts[0],
        DataError::InvalidCreator { .. }
    ));
    store
        .read(|db| {
            assert!(db.item(test_library(), "BOOK2345").is_err());
            Ok(())
        })
        .expect("strict leaves nothing");

    // Lenient ingestion coerces it to the type's primary creator.
    store
        .write(|db| store_response::store_items(db, &schema, &[remote.clone()], false, false))
        .expect("lenient ingest");
    store
        .read(|db| {
            let item = db.item(test_library(), "BOOK2345")?;
            assert_eq!(item.creators[0].creator_type, "author");
            assert!(item.creators[0].primary);
            Ok(())
        })
        .expect("verify");
}

#[test]
fn test_remote_deletion_of_changed_item_held_for_resolution() {
    let mut store = Store::new();

    store
        .write(|db| {
            let mut item = Item::new("BOOK2345", test_library(), "book");
            item.set_title("In progress");
            item.mark_as_changed_local();
            db.insert_item(item)
        })
        .expect("seed");

    let server_deletions = Deletions {
        collections: Vec::new(),
        items: vec!["BOOK2345".to_string()],
        searches: Vec::new(),
        tags: Vec::new(),
    };

    let conflicts = store
        .write(|db| {
            deletions::perform_deletions(
                db,
                test_library(),
                &server_deletions,
                ConflictMode::ResolveConflicts,
            )
        })
        .expect("deletions");
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].0, "BOOK2345");

    // User chose to discard the local edit: the same deletions applied
    // with the delete policy remove the item.
    store
        .write(|db| {
            deletions::perform_deletions(
                db,
                test_library(),
                &server_deletions,
                ConflictMode::DeleteConflicts,
            )?;
            Ok(())
        })
        .expect("resolve");
    store
        .read(|db| {
            assert!(db.item(test_library(), "BOOK2345").is_err());
            Ok(())
        })
        .expect("verify");
}

#[test]
fn test_remote_deletion_restore_keeps_item_and_marks_it_changed() {
    let mut store = Store::new();

    store
        .write(|db| {
            let mut item = Item::new("BOOK2345", test_library(), "book");
            item.meta = SyncMeta::new_synced(5);
            item.set_title("Keep me");
            db.insert_item(item)?;
            items::edit_item_field(db, test_library(), "BOOK2345", "place", "Uppsala")?;
            Ok(())
        })
        .expect("seed");

    let server_deletions = Deletions {
        collections: Vec::new(),
        items: vec!["BOOK2345".to_string()],
        searches: Vec::new(),
        tags: Vec::new(),
    };

    store
        .write(|db| {
            let conflicts = deletions::perform_deletions(
                db,
                test_library(),
                &server_deletions,
                ConflictMode::RestoreConflicts,
            )?;
            assert!(conflicts.is_empty());
            Ok(())
        })
        .expect("restore");

    store
        .read(|db| {
            let item = db.item(test_library(), "BOOK2345")?;
            // Restored objects must upload as new: full change set,
            // version reset.
            assert!(item.is_changed());
            assert_eq!(item.meta.version, 0);
            Ok(())
        })
        .expect("verify");
}

#[test]
fn test_full_sync_restores_locally_known_objects_missing_remotely() {
    let mut store = Store::new();

    store
        .write(|db| {
            let mut present = Item::new("KEEP2345", test_library(), "book");
            present.meta = SyncMeta::new_synced(3);
            db.insert_item(present)?;

            let mut missing = Item::new("LOST2345", test_library(), "book");
            missing.meta = SyncMeta::new_synced(3);
            missing.set_title("Dropped remotely");
            db.insert_item(missing)?;

            let mut tombstoned = Item::new("GONE2345", test_library(), "book");
            tombstoned.meta = SyncMeta::new_synced(3);
            tombstoned.meta.deleted = true;
            db.insert_item(tombstoned)?;
            Ok(())
        })
        .expect("seed");

    // The server's full version map only knows KEEP2345.
    let mut versions = BTreeMap::new();
    versions.insert("KEEP2345".to_string(), 3);

    store
        .write(|db| {
            mark_changed::mark_other_objects_as_changed(
                db,
                SyncObjectKind::Item,
                test_library(),
                &versions,
            )
        })
        .expect("full sync");

    store
        .read(|db| {
            assert!(!db.item(test_library(), "KEEP2345")?.is_changed());
            // Missing-but-live objects are queued for re-upload.
            let restored = db.item(test_library(), "LOST2345")?;
            assert!(restored.is_changed());
            assert_eq!(restored.meta.version, 0);
            // Tombstones the server no longer knows are purged outright.
            assert!(db.item(test_library(), "GONE2345").is_err());
            Ok(())
        })
        .expect("verify");
}

#[test]
fn test_unknown_collection_keys_detected_for_deferred_ingest() {
    let mut store = Store::new();

    store
        .write(|db| {
            db.insert_collection(citestream_storage::entities::Collection::new(
                "COLL2345",
                test_library(),
                "Known",
            ))
        })
        .expect("seed");

    let mut remote = payload("BOOK2345", 2);
    remote.collection_keys = vec!["COLL2345".to_string(), "MISS2345".to_string()];

    store
        .read(|db| {
            let unknown = store_response::unknown_collection_keys(db, &remote);
            assert_eq!(unknown, vec!["MISS2345".to_string()]);
            Ok(())
        })
        .expect("verify");
}
