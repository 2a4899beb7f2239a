// crates/storage/src/requests/store_response.rs
//! Sync-download ingestion
//!
//! Applies server payloads to local objects. `prefer_remote_data` decides
//! what happens when the local copy disagrees: when false, a tombstoned or
//! locally-changed object raises a per-item conflict; when true, remote
//! data overwrites local state unconditionally. Batch ingestion collects
//! the known per-item error kinds into a report and aborts on anything
//! unclassified.

use crate::entities::{
    item_types, ChangeType, Collection, Creator, Item, ItemField, Path, Rect, Search,
    SearchCondition, SyncState, Tag, TagKind, TypedTag,
};
use crate::schema::Schema;
use crate::store::Database;
use chrono::{DateTime, Utc};
use citestream_core::{DataError, LibraryId, Result};
use std::collections::BTreeSet;

/// Server payload of one item
#[derive(Debug, Clone)]
pub struct ItemPayload {
    pub key: String,
    pub library_id: LibraryId,
    pub raw_type: String,
    pub version: i32,
    pub title: String,
    pub trash: bool,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub parent_key: Option<String>,
    pub collection_keys: Vec<String>,
    /// `(key, base_key, value)` triples
    pub fields: Vec<(String, Option<String>, String)>,
    pub creators: Vec<CreatorPayload>,
    /// `(predicate, url)` pairs
    pub relations: Vec<(String, String)>,
    pub tags: Vec<TagPayload>,
    pub rects: Vec<Rect>,
    pub paths: Vec<Path>,
}

/// Server payload of one creator entry
#[derive(Debug, Clone)]
pub struct CreatorPayload {
    pub creator_type: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
}

/// Server payload of one tag assignment
#[derive(Debug, Clone)]
pub struct TagPayload {
    pub tag: String,
    pub kind: TagKind,
}

/// Server payload of one collection
#[derive(Debug, Clone)]
pub struct CollectionPayload {
    pub key: String,
    pub library_id: LibraryId,
    pub version: i32,
    pub name: String,
    pub parent_key: Option<String>,
    pub trash: bool,
}

/// Server payload of one saved search
#[derive(Debug, Clone)]
pub struct SearchPayload {
    pub key: String,
    pub library_id: LibraryId,
    pub version: i32,
    pub name: String,
    pub conditions: Vec<SearchCondition>,
}

/// Per-item conflicts collected from one ingestion batch
#[derive(Debug, Default)]
pub struct StoreOutcome {
    pub conflicts: Vec<DataError>,
}

/// Ingests a batch of item payloads; per-item conflicts and schema
/// violations land in the outcome, anything else aborts the transaction
pub fn store_items(
    db: &mut Database,
    schema: &Schema,
    payloads: &[ItemPayload],
    prefer_remote_data: bool,
    deny_incorrect_creator: bool,
) -> Result<StoreOutcome> {
    let mut outcome = StoreOutcome::default();
    for payload in payloads {
        match store_item(db, schema, payload, prefer_remote_data, deny_incorrect_creator) {
            Ok(()) => {}
            Err(err) if err.is_item_conflict() || err.is_schema_violation() => {
                outcome.conflicts.push(err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(outcome)
}

/// Ingests one item payload
pub fn store_item(
    db: &mut Database,
    schema: &Schema,
    payload: &ItemPayload,
    prefer_remote_data: bool,
    deny_incorrect_creator: bool,
) -> Result<()> {
    if payload.key.is_empty() {
        return Err(DataError::PrimaryKeyUnavailable);
    }

    let table_key = (payload.library_id, payload.key.clone());
    let exists = db.items.contains_key(&table_key);

    if exists {
        let item = db.item(payload.library_id, &payload.key)?;
        if !prefer_remote_data {
            if item.meta.deleted {
                return Err(DataError::ItemDeleted {
                    key: payload.key.clone(),
                });
            }
            if item.is_changed() {
                return Err(DataError::ItemChanged {
                    key: payload.key.clone(),
                });
            }
        }
    }

    // Creators are validated before any state is touched so a schema
    // violation leaves the local object as it was.
    let creators = sync_creators(schema, payload, deny_incorrect_creator)?;

    if !exists {
        db.insert_item(Item::new(
            payload.key.clone(),
            payload.library_id,
            payload.raw_type.clone(),
        ))?;
    }

    sync_item_tags(db, payload);

    let item = db.item_mut(payload.library_id, &payload.key)?;
    if prefer_remote_data {
        item.meta.deleted = false;
        item.delete_all_changes();
        item.attachment_needs_sync = false;
    }

    item.raw_type = payload.raw_type.clone();
    item.trash = payload.trash;
    item.date_added = payload.date_added;
    item.date_modified = payload.date_modified;
    item.parent_key = payload.parent_key.clone();
    item.collection_keys = payload.collection_keys.iter().cloned().collect();
    item.fields = payload
        .fields
        .iter()
        .map(|(key, base_key, value)| ItemField {
            key: key.clone(),
            base_key: base_key.clone(),
            value: value.clone(),
            changed: false,
        })
        .collect();
    item.creators = creators;
    item.relations = payload
        .relations
        .iter()
        .map(|(predicate, url)| crate::entities::item::Relation {
            predicate: predicate.clone(),
            url: url.clone(),
        })
        .collect();
    item.rects = payload.rects.clone();
    item.paths = payload.paths.clone();
    item.set_title(payload.title.clone());
    item.meta.note_sync(payload.version);
    Ok(())
}

fn sync_creators(
    schema: &Schema,
    payload: &ItemPayload,
    deny_incorrect_creator: bool,
) -> Result<Vec<Creator>> {
    if !item_types::supports_creators(&payload.raw_type) || payload.creators.is_empty() {
        return Ok(Vec::new());
    }

    let valid = match schema.creators(&payload.raw_type) {
        Some(creators) if !creators.is_empty() => creators,
        _ => {
            log::warn!(
                "no valid creators for item type {}; skipping creators",
                payload.raw_type
            );
            return Err(DataError::NoValidCreators {
                item_key: payload.key.clone(),
                item_type: payload.raw_type.clone(),
            });
        }
    };

    let mut creators = Vec::with_capacity(payload.creators.len());
    for (idx, creator) in payload.creators.iter().enumerate() {
        let creator_type = if valid.iter().any(|c| c.creator_type == creator.creator_type) {
            creator.creator_type.clone()
        } else if deny_incorrect_creator {
            return Err(DataError::InvalidCreator {
                item_key: payload.key.clone(),
                creator_type: creator.creator_type.clone(),
            });
        } else {
            let replacement = valid
                .iter()
                .find(|c| c.primary)
                .unwrap_or(&valid[0])
                .creator_type
                .clone();
            log::warn!(
                "creator type '{}' isn't valid for {}; coercing to '{}'",
                creator.creator_type,
                payload.raw_type,
                replacement
            );
            replacement
        };

        creators.push(Creator {
            primary: schema.creator_is_primary(&payload.raw_type, &creator_type),
            creator_type,
            first_name: creator.first_name.clone(),
            last_name: creator.last_name.clone(),
            name: creator.name.clone(),
            order_id: idx as i32,
        });
    }
    Ok(creators)
}

fn sync_item_tags(db: &mut Database, payload: &ItemPayload) {
    db.remove_item_tag_links(payload.library_id, &payload.key);
    for tag in &payload.tags {
        let tag_key = (payload.library_id, tag.tag.clone());
        db.tags
            .entry(tag_key)
            .or_insert_with(|| Tag::new(tag.tag.clone(), payload.library_id));
        db.typed_tags.push(TypedTag {
            tag_name: tag.tag.clone(),
            item_key: payload.key.clone(),
            library_id: payload.library_id,
            kind: tag.kind,
        });
    }
    db.prune_orphaned_tags(payload.library_id);
}

/// Ingests a batch of collection payloads under the same conflict rules
/// as items
pub fn store_collections(
    db: &mut Database,
    payloads: &[CollectionPayload],
    prefer_remote_data: bool,
) -> Result<StoreOutcome> {
    let mut outcome = StoreOutcome::default();
    for payload in payloads {
        match store_collection(db, payload, prefer_remote_data) {
            Ok(()) => {}
            Err(err) if err.is_item_conflict() => outcome.conflicts.push(err),
            Err(err) => return Err(err),
        }
    }
    Ok(outcome)
}

/// Ingests one collection payload
pub fn store_collection(
    db: &mut Database,
    payload: &CollectionPayload,
    prefer_remote_data: bool,
) -> Result<()> {
    if payload.key.is_empty() {
        return Err(DataError::PrimaryKeyUnavailable);
    }

    let table_key = (payload.library_id, payload.key.clone());
    if let Some(collection) = db.collections.get(&table_key) {
        if !prefer_remote_data {
            if collection.meta.deleted {
                return Err(DataError::ItemDeleted {
                    key: payload.key.clone(),
                });
            }
            if collection.is_changed() {
                return Err(DataError::ItemChanged {
                    key: payload.key.clone(),
                });
            }
        }
    } else {
        db.insert_collection(Collection::new(
            payload.key.clone(),
            payload.library_id,
            payload.name.clone(),
        ))?;
    }

    let collection = db.collection_mut(payload.library_id, &payload.key)?;
    if prefer_remote_data {
        collection.meta.deleted = false;
        collection.delete_all_changes();
    }
    collection.name = payload.name.clone();
    collection.parent_key = payload.parent_key.clone();
    collection.trash = payload.trash;
    collection.meta.note_sync(payload.version);
    Ok(())
}

/// Ingests a batch of search payloads under the same conflict rules as
/// items
pub fn store_searches(
    db: &mut Database,
    payloads: &[SearchPayload],
    prefer_remote_data: bool,
) -> Result<StoreOutcome> {
    let mut outcome = StoreOutcome::default();
    for payload in payloads {
        match store_search(db, payload, prefer_remote_data) {
            Ok(()) => {}
            Err(err) if err.is_item_conflict() => outcome.conflicts.push(err),
            Err(err) => return Err(err),
        }
    }
    Ok(outcome)
}

/// Ingests one search payload
pub fn store_search(
    db: &mut Database,
    payload: &SearchPayload,
    prefer_remote_data: bool,
) -> Result<()> {
    if payload.key.is_empty() {
        return Err(DataError::PrimaryKeyUnavailable);
    }

    let table_key = (payload.library_id, payload.key.clone());
    if let Some(search) = db.searches.get(&table_key) {
        if !prefer_remote_data {
            if search.meta.deleted {
                return Err(DataError::ItemDeleted {
                    key: payload.key.clone(),
                });
            }
            if search.is_changed() {
                return Err(DataError::ItemChanged {
                    key: payload.key.clone(),
                });
            }
        }
    } else {
        db.insert_search(Search::new(
            payload.key.clone(),
            payload.library_id,
            payload.name.clone(),
        ))?;
    }

    let search = db.search_mut(payload.library_id, &payload.key)?;
    if prefer_remote_data {
        search.meta.deleted = false;
        search.delete_all_changes();
    }
    search.name = payload.name.clone();
    search.conditions = payload.conditions.clone();
    search.meta.note_sync(payload.version);
    Ok(())
}

/// Collection keys an ingested item references that don't exist locally;
/// the sync pass schedules these for fetching
pub fn unknown_collection_keys(db: &Database, payload: &ItemPayload) -> Vec<String> {
    let known: BTreeSet<&String> = db
        .collections_in_library(payload.library_id)
        .map(|c| &c.key)
        .collect();
    payload
        .collection_keys
        .iter()
        .filter(|key| !known.contains(key))
        .cloned()
        .collect()
}
