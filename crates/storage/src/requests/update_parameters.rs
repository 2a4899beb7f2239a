// crates/storage/src/requests/update_parameters.rs
//! Update-parameter assembly for upload batching
//!
//! For every kind this collects changed-and-not-tombstoned objects,
//! renders each one's pending field groups into a semantic parameter map
//! and captures the originating change identifiers for post-upload
//! acknowledgment. Items and collections are leveled so parents always
//! precede children in the emitted order; parent-chain walks are
//! cycle-safe and abort with a logged diagnostic instead of looping.

use crate::entities::{field_keys, item_types, Collection, Item, ItemChange};
use crate::store::Database;
use citestream_core::LibraryId;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Parameter maps in upload order plus the change identifiers each key's
/// acknowledgment must name
#[derive(Debug, Default)]
pub struct UpdateParametersResponse {
    pub parameters: Vec<Map<String, Value>>,
    pub change_ids: BTreeMap<String, Vec<Uuid>>,
}

fn rounded3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Renders one item's pending changes into an update-parameter map
pub fn item_update_parameters(db: &Database, item: &Item) -> Option<Map<String, Value>> {
    if !item.is_changed() {
        return None;
    }

    let mut parameters = Map::new();
    parameters.insert("key".to_string(), json!(item.key));
    parameters.insert("version".to_string(), json!(item.meta.version));
    parameters.insert(
        "dateModified".to_string(),
        json!(item.date_modified.to_rfc3339()),
    );
    parameters.insert("dateAdded".to_string(), json!(item.date_added.to_rfc3339()));

    let changes = item.changed_fields();
    let mut position_field_changed = false;

    if changes.contains(&ItemChange::Type) {
        parameters.insert("itemType".to_string(), json!(item.raw_type));
    }
    if changes.contains(&ItemChange::Trash) {
        parameters.insert("deleted".to_string(), json!(item.trash));
    }
    if changes.contains(&ItemChange::Tags) {
        let tags: Vec<Value> = db
            .typed_tags
            .iter()
            .filter(|tt| tt.library_id == item.library_id && tt.item_key == item.key)
            .map(|tt| json!({ "tag": tt.tag_name, "type": tt.kind.as_int() }))
            .collect();
        parameters.insert("tags".to_string(), json!(tags));
    }
    if changes.contains(&ItemChange::Collections) {
        let keys: Vec<&String> = item.collection_keys.iter().collect();
        parameters.insert("collections".to_string(), json!(keys));
    }
    if changes.contains(&ItemChange::Relations) {
        let mut relations = Map::new();
        for relation in &item.relations {
            relations.insert(relation.predicate.clone(), json!(relation.url));
        }
        parameters.insert("relations".to_string(), Value::Object(relations));
    }
    if changes.contains(&ItemChange::Parent) {
        let parent = match &item.parent_key {
            Some(key) => json!(key),
            None => json!(false),
        };
        parameters.insert("parentItem".to_string(), parent);
    }
    if changes.contains(&ItemChange::Creators) {
        let mut sorted: Vec<_> = item.creators.iter().collect();
        sorted.sort_by_key(|c| c.order_id);
        let creators: Vec<Value> = sorted
            .iter()
            .map(|c| {
                if c.name.is_empty() {
                    json!({
                        "creatorType": c.creator_type,
                        "firstName": c.first_name,
                        "lastName": c.last_name,
                    })
                } else {
                    json!({ "creatorType": c.creator_type, "name": c.name })
                }
            })
            .collect();
        parameters.insert("creators".to_string(), json!(creators));
    }
    if changes.contains(&ItemChange::Fields) {
        for field in item.fields.iter().filter(|f| f.changed) {
            if field.base_key.as_deref() == Some(field_keys::ANNOTATION_POSITION) {
                position_field_changed = true;
                continue;
            }
            match field.key.as_str() {
                // The file store owns these; the service fills them in
                // after the byte upload.
                field_keys::MD5 | field_keys::MTIME => {
                    parameters.insert(field.key.clone(), json!(""));
                }
                _ => {
                    parameters.insert(field.key.clone(), json!(field.value));
                }
            }
        }
    }

    if item.raw_type == item_types::ANNOTATION
        && (changes.contains(&ItemChange::Rects)
            || changes.contains(&ItemChange::Paths)
            || position_field_changed)
    {
        if let Some(position) = annotation_position(item) {
            parameters.insert(field_keys::ANNOTATION_POSITION.to_string(), json!(position));
        }
    }

    Some(parameters)
}

/// Assembles the `position` JSON string from position-aliased fields plus
/// the item's geometry: ink annotations carry flattened point paths, all
/// other annotation types carry rect corner quadruples
fn annotation_position(item: &Item) -> Option<String> {
    let annotation_type = item.annotation_type()?;
    let mut position = Map::new();

    for field in item
        .fields
        .iter()
        .filter(|f| f.base_key.as_deref() == Some(field_keys::ANNOTATION_POSITION))
    {
        let value = if let Ok(int) = field.value.parse::<i64>() {
            json!(int)
        } else if let Ok(float) = field.value.parse::<f64>() {
            json!(float)
        } else if let Ok(parsed) = serde_json::from_str::<Value>(&field.value) {
            parsed
        } else {
            json!(field.value)
        };
        position.insert(field.key.clone(), value);
    }

    if annotation_type == field_keys::annotation_type::INK {
        let mut sorted: Vec<_> = item.paths.iter().collect();
        sorted.sort_by_key(|p| p.sort_index);
        let paths: Vec<Vec<f64>> = sorted
            .iter()
            .map(|path| {
                path.points
                    .iter()
                    .flat_map(|p| [rounded3(p.x), rounded3(p.y)])
                    .collect()
            })
            .collect();
        position.insert("paths".to_string(), json!(paths));
    } else {
        let rects: Vec<Vec<f64>> = item
            .rects
            .iter()
            .map(|r| {
                vec![
                    rounded3(r.min_x),
                    rounded3(r.min_y),
                    rounded3(r.max_x),
                    rounded3(r.max_y),
                ]
            })
            .collect();
        position.insert("rects".to_string(), json!(rects));
    }

    serde_json::to_string(&position).ok()
}

/// Items with pending changes and no tombstone, in upload order.
/// Returns the parameter response plus a flag telling the caller whether
/// any changed attachment still needs its bytes uploaded.
pub fn read_updated_item_parameters(
    db: &Database,
    library_id: LibraryId,
) -> (UpdateParametersResponse, bool) {
    let objects: Vec<&Item> = db
        .items_in_library(library_id)
        .filter(|i| i.is_changed() && !i.meta.deleted)
        .collect();

    // Fast path: a single changed object never needs leveling.
    if objects.len() == 1 {
        let item = objects[0];
        if let Some(parameters) = item_update_parameters(db, item) {
            let mut response = UpdateParametersResponse::default();
            response.parameters.push(parameters);
            response.change_ids.insert(
                item.key.clone(),
                item.changes.iter().map(|c| c.identifier).collect(),
            );
            return (response, item.attachment_needs_sync);
        }
    }

    let mut has_upload = false;
    let mut key_to_level: BTreeMap<String, usize> = BTreeMap::new();
    let mut levels: BTreeMap<usize, Vec<Map<String, Value>>> = BTreeMap::new();
    let mut change_ids = BTreeMap::new();

    for item in &objects {
        if item.attachment_needs_sync {
            has_upload = true;
        }
        let Some(parameters) = item_update_parameters(db, item) else {
            continue;
        };

        let level = item_level(db, library_id, item, &key_to_level);
        key_to_level.insert(item.key.clone(), level);
        change_ids.insert(
            item.key.clone(),
            item.changes.iter().map(|c| c.identifier).collect(),
        );
        levels.entry(level).or_default().push(parameters);
    }

    let parameters = levels.into_values().flatten().collect();
    (
        UpdateParametersResponse {
            parameters,
            change_ids,
        },
        has_upload,
    )
}

/// Parent-chain depth of an item. A memoized ancestor short-circuits the
/// walk; a cycle aborts with the level reached so far.
fn item_level(
    db: &Database,
    library_id: LibraryId,
    item: &Item,
    cache: &BTreeMap<String, usize>,
) -> usize {
    let mut keys: BTreeSet<String> = BTreeSet::new();
    keys.insert(item.key.clone());
    let mut level = 0;
    let mut parent_key = item.parent_key.clone();

    while let Some(current_key) = parent_key {
        if let Some(cached) = cache.get(&current_key) {
            return cached + 1;
        }
        if keys.contains(&current_key) {
            log::warn!("item parent loop; key={current_key}; keys={keys:?}");
            return level;
        }

        parent_key = db
            .item(library_id, &current_key)
            .ok()
            .and_then(|parent| parent.parent_key.clone());
        level += 1;
        keys.insert(current_key);
    }
    level
}

/// Collections with pending changes and no tombstone, in upload order
pub fn read_updated_collection_parameters(
    db: &Database,
    library_id: LibraryId,
) -> UpdateParametersResponse {
    let objects: Vec<&Collection> = db
        .collections_in_library(library_id)
        .filter(|c| c.is_changed() && !c.meta.deleted)
        .collect();

    if objects.len() == 1 {
        let collection = objects[0];
        if let Some(parameters) = collection.update_parameters() {
            let mut response = UpdateParametersResponse::default();
            response.parameters.push(parameters);
            response.change_ids.insert(
                collection.key.clone(),
                collection.changes.iter().map(|c| c.identifier).collect(),
            );
            return response;
        }
    }

    let mut levels: BTreeMap<usize, Vec<Map<String, Value>>> = BTreeMap::new();
    let mut change_ids = BTreeMap::new();

    for collection in &objects {
        let Some(parameters) = collection.update_parameters() else {
            continue;
        };
        change_ids.insert(
            collection.key.clone(),
            collection.changes.iter().map(|c| c.identifier).collect(),
        );
        let level = collection_level(db, library_id, collection);
        levels.entry(level).or_default().push(parameters);
    }

    UpdateParametersResponse {
        parameters: levels.into_values().flatten().collect(),
        change_ids,
    }
}

/// Parent-chain depth of a collection, cycle-safe
fn collection_level(db: &Database, library_id: LibraryId, collection: &Collection) -> usize {
    let mut keys: BTreeSet<String> = BTreeSet::new();
    keys.insert(collection.key.clone());
    let mut level = 0;
    let mut parent_key = collection.parent_key.clone();

    while let Some(current_key) = parent_key {
        if keys.contains(&current_key) {
            log::warn!("collection parent loop; key={current_key}; keys={keys:?}");
            return level;
        }
        parent_key = db
            .collection(library_id, &current_key)
            .ok()
            .and_then(|parent| parent.parent_key.clone());
        level += 1;
        keys.insert(current_key);
    }
    level
}

/// Saved searches with pending changes and no tombstone
pub fn read_updated_search_parameters(
    db: &Database,
    library_id: LibraryId,
) -> UpdateParametersResponse {
    let mut response = UpdateParametersResponse::default();
    for search in db
        .searches_in_library(library_id)
        .filter(|s| s.is_changed() && !s.meta.deleted)
    {
        let Some(parameters) = search.update_parameters() else {
            continue;
        };
        response.change_ids.insert(
            search.key.clone(),
            search.changes.iter().map(|c| c.identifier).collect(),
        );
        response.parameters.push(parameters);
    }
    response
}

/// Changed reading positions; settings sync only exists for personal
/// libraries, a group library yields nothing
pub fn read_updated_settings_parameters(
    db: &Database,
    library_id: LibraryId,
) -> UpdateParametersResponse {
    let mut response = UpdateParametersResponse::default();
    if matches!(library_id, LibraryId::Group(_)) {
        return response;
    }

    for page in db
        .page_indices
        .values()
        .filter(|p| p.library_id == library_id && p.is_changed())
    {
        let Some(parameters) = page.update_parameters() else {
            continue;
        };
        let Some(settings_key) = parameters.keys().next().cloned() else {
            continue;
        };
        response.change_ids.insert(
            settings_key,
            page.changes.iter().map(|c| c.identifier).collect(),
        );
        response.parameters.push(parameters);
    }
    response
}
