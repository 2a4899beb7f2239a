// crates/storage/src/requests/sync_versions.rs
//! Version reconciliation: computing which objects a sync pass must
//! re-fetch, and recording the per-kind version anchors afterwards.

use crate::entities::{SyncState, Versions};
use crate::store::Database;
use chrono::{Duration, Utc};
use citestream_core::{LibraryId, Result, SyncMode, SyncObjectKind};
use std::collections::BTreeMap;

/// Computes the key list to re-fetch for one kind.
///
/// Every key in the server's version map starts as a candidate; a local
/// object that is synced at the same version drops out. Non-synced local
/// objects are always included under the delay-ignoring modes; under the
/// delay-sensitive modes an object is included only once its backoff
/// delay (indexed by retry count, capped at the longest interval) has
/// elapsed since the last sync attempt, and is explicitly excluded
/// otherwise.
pub fn sync_versions(
    db: &Database,
    library_id: LibraryId,
    kind: SyncObjectKind,
    versions: &BTreeMap<String, i32>,
    mode: SyncMode,
    delay_intervals: &[Duration],
) -> Vec<String> {
    match kind {
        SyncObjectKind::Collection => {
            let objects: Vec<_> = db
                .collections_in_library(library_id)
                .map(|c| (c.key.clone(), c.meta.clone()))
                .collect();
            check(versions, &objects, mode, delay_intervals)
        }
        SyncObjectKind::Search => {
            let objects: Vec<_> = db
                .searches_in_library(library_id)
                .map(|s| (s.key.clone(), s.meta.clone()))
                .collect();
            check(versions, &objects, mode, delay_intervals)
        }
        SyncObjectKind::Item | SyncObjectKind::Trash => {
            let in_trash = kind == SyncObjectKind::Trash;
            let objects: Vec<_> = db
                .items_in_library(library_id)
                .filter(|i| i.trash == in_trash)
                .map(|i| (i.key.clone(), i.meta.clone()))
                .collect();
            check(versions, &objects, mode, delay_intervals)
        }
        SyncObjectKind::Settings => Vec::new(),
    }
}

fn check(
    versions: &BTreeMap<String, i32>,
    objects: &[(String, crate::entities::SyncMeta)],
    mode: SyncMode,
    delay_intervals: &[Duration],
) -> Vec<String> {
    let now = Utc::now();
    let mut to_update: Vec<String> = versions.keys().cloned().collect();

    for (key, meta) in objects {
        if meta.sync_state == SyncState::Synced {
            if versions.get(key) == Some(&meta.version) {
                to_update.retain(|k| k != key);
            }
            continue;
        }

        if !mode.respects_delays() {
            if !to_update.contains(key) {
                to_update.push(key.clone());
            }
            continue;
        }

        let idx = (meta.sync_retries.max(0) as usize).min(delay_intervals.len().saturating_sub(1));
        let delay = delay_intervals.get(idx).copied().unwrap_or_else(Duration::zero);
        let delay_elapsed = meta
            .last_sync_date
            .map(|last| now - last >= delay)
            .unwrap_or(false);

        if delay_elapsed {
            if !to_update.contains(key) {
                to_update.push(key.clone());
            }
        } else {
            to_update.retain(|k| k != key);
        }
    }
    to_update
}

/// Computes the group ids to update and the locally-known groups missing
/// from the server map, reported with their names as removal candidates
pub fn sync_group_versions(
    db: &Database,
    versions: &BTreeMap<i32, i32>,
) -> (Vec<i32>, Vec<(i32, String)>) {
    let to_remove: Vec<(i32, String)> = db
        .groups
        .values()
        .filter(|g| !versions.contains_key(&g.identifier))
        .map(|g| (g.identifier, g.name.clone()))
        .collect();

    let mut to_update: Vec<i32> = versions.keys().copied().collect();
    for group in db.groups.values() {
        if group.sync_state != SyncState::Synced {
            if !to_update.contains(&group.identifier) {
                to_update.push(group.identifier);
            }
        } else if versions.get(&group.identifier) == Some(&group.version) {
            to_update.retain(|id| *id != group.identifier);
        }
    }
    (to_update, to_remove)
}

/// Marks the given keys for re-fetch: known objects become outdated with
/// one more retry on the counter; unknown keys get placeholder records in
/// the dirty state so the download fills them in
pub fn mark_for_resync(
    db: &mut Database,
    library_id: LibraryId,
    kind: SyncObjectKind,
    keys: &[String],
) -> Result<()> {
    match kind {
        SyncObjectKind::Collection => {
            for key in keys {
                if db.collections.contains_key(&(library_id, key.clone())) {
                    let collection = db.collection_mut(library_id, key)?;
                    collection.meta.sync_state = SyncState::Outdated;
                    collection.meta.sync_retries += 1;
                    collection.meta.last_sync_date = Some(Utc::now());
                } else {
                    let mut collection = crate::entities::Collection::new(key, library_id, "");
                    collection.meta.sync_state = SyncState::Dirty;
                    db.insert_collection(collection)?;
                }
            }
        }
        SyncObjectKind::Search => {
            for key in keys {
                if db.searches.contains_key(&(library_id, key.clone())) {
                    let search = db.search_mut(library_id, key)?;
                    search.meta.sync_state = SyncState::Outdated;
                    search.meta.sync_retries += 1;
                    search.meta.last_sync_date = Some(Utc::now());
                } else {
                    let mut search = crate::entities::Search::new(key, library_id, "");
                    search.meta.sync_state = SyncState::Dirty;
                    db.insert_search(search)?;
                }
            }
        }
        SyncObjectKind::Item | SyncObjectKind::Trash => {
            for key in keys {
                if db.items.contains_key(&(library_id, key.clone())) {
                    let item = db.item_mut(library_id, key)?;
                    item.meta.sync_state = SyncState::Outdated;
                    item.meta.sync_retries += 1;
                    item.meta.last_sync_date = Some(Utc::now());
                } else {
                    let mut item = crate::entities::Item::new(key, library_id, "document");
                    item.meta.sync_state = SyncState::Dirty;
                    db.insert_item(item)?;
                }
            }
        }
        SyncObjectKind::Settings => {}
    }
    Ok(())
}

/// Records the last-seen server version for one kind within a library
pub fn store_version(
    db: &mut Database,
    library_id: LibraryId,
    kind: SyncObjectKind,
    version: i32,
) -> Result<()> {
    match library_id {
        LibraryId::Custom(library_type) => {
            db.custom_library_mut(library_type)
                .versions
                .set_for_kind(kind, version);
            Ok(())
        }
        LibraryId::Group(identifier) => {
            let group = db.groups.get_mut(&identifier).ok_or_else(|| {
                citestream_core::DataError::NotFound {
                    entity: "Group",
                    key: identifier.to_string(),
                }
            })?;
            group.versions.set_for_kind(kind, version);
            Ok(())
        }
    }
}

/// Last-known version anchors for a library, zeroed when unknown
pub fn read_versions(db: &Database, library_id: LibraryId) -> Versions {
    match library_id {
        LibraryId::Custom(library_type) => db
            .custom_libraries
            .get(&library_type)
            .map(|l| l.versions)
            .unwrap_or_default(),
        LibraryId::Group(identifier) => db
            .groups
            .get(&identifier)
            .map(|g| g.versions)
            .unwrap_or_default(),
    }
}
