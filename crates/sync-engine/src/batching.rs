// crates/sync-engine/src/batching.rs
//! Write/delete batch assembly
//!
//! Collects each library's pending changes through the storage command
//! layer and chunks them to the service's batch limits. Chunking never
//! reorders: the leveled parameter order is preserved across chunk
//! boundaries, so a parent landing at the end of one batch still uploads
//! before its child at the start of the next.

use crate::error::SyncResult;
use crate::types::{DeleteBatch, LibraryData, WriteBatch};
use citestream_core::{LibraryId, SyncObjectKind};
use citestream_storage::requests::{deletions, sync_versions, update_parameters};
use citestream_storage::Database;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kinds in write-batch order; settings last so new objects exist before
/// positions referencing them
const WRITE_KIND_ORDER: [SyncObjectKind; 4] = [
    SyncObjectKind::Collection,
    SyncObjectKind::Item,
    SyncObjectKind::Search,
    SyncObjectKind::Settings,
];

/// Kinds in delete-batch order; items last so collection and search
/// deletions never race their member updates
const DELETE_KIND_ORDER: [SyncObjectKind; 3] = [
    SyncObjectKind::Collection,
    SyncObjectKind::Search,
    SyncObjectKind::Item,
];

/// Builds the write batches for one library. Returns the batches plus a
/// flag telling the caller whether an attachment upload must follow.
pub fn write_batches(db: &Database, library_id: LibraryId) -> (Vec<WriteBatch>, bool) {
    let versions = sync_versions::read_versions(db, library_id);
    let mut batches = Vec::new();
    let mut has_upload = false;

    for kind in WRITE_KIND_ORDER {
        let response = match kind {
            SyncObjectKind::Collection => {
                update_parameters::read_updated_collection_parameters(db, library_id)
            }
            SyncObjectKind::Item => {
                let (response, upload) =
                    update_parameters::read_updated_item_parameters(db, library_id);
                has_upload = upload;
                response
            }
            SyncObjectKind::Search => {
                update_parameters::read_updated_search_parameters(db, library_id)
            }
            SyncObjectKind::Settings => {
                update_parameters::read_updated_settings_parameters(db, library_id)
            }
            SyncObjectKind::Trash => continue,
        };
        if response.parameters.is_empty() {
            continue;
        }
        batches.extend(chunk_writes(
            library_id,
            kind,
            versions.for_kind(kind),
            response.parameters,
            &response.change_ids,
        ));
    }
    (batches, has_upload)
}

fn chunk_writes(
    library_id: LibraryId,
    kind: SyncObjectKind,
    version: i32,
    parameters: Vec<Map<String, Value>>,
    change_ids: &BTreeMap<String, Vec<Uuid>>,
) -> Vec<WriteBatch> {
    let mut batches = Vec::new();
    let mut chunk: Vec<Map<String, Value>> = Vec::new();

    for params in parameters {
        if chunk.len() == WriteBatch::MAX_COUNT {
            batches.push(finish_chunk(
                library_id,
                kind,
                version,
                std::mem::take(&mut chunk),
                change_ids,
            ));
        }
        chunk.push(params);
    }
    if !chunk.is_empty() {
        batches.push(finish_chunk(library_id, kind, version, chunk, change_ids));
    }
    batches
}

fn finish_chunk(
    library_id: LibraryId,
    kind: SyncObjectKind,
    version: i32,
    parameters: Vec<Map<String, Value>>,
    change_ids: &BTreeMap<String, Vec<Uuid>>,
) -> WriteBatch {
    let mut batch = WriteBatch {
        library_id,
        kind,
        version,
        parameters,
        change_ids: BTreeMap::new(),
    };
    for key in batch.keys() {
        if let Some(ids) = change_ids.get(&key) {
            batch.change_ids.insert(key, ids.clone());
        }
    }
    batch
}

/// Builds the delete batches for one library from its tombstoned keys
pub fn delete_batches(db: &Database, library_id: LibraryId) -> Vec<DeleteBatch> {
    let versions = sync_versions::read_versions(db, library_id);
    let mut batches = Vec::new();

    for kind in DELETE_KIND_ORDER {
        let keys = deletions::read_deleted_object_keys(db, library_id, kind);
        let version = versions.for_kind(kind);
        for chunk in keys.chunks(DeleteBatch::MAX_COUNT) {
            batches.push(DeleteBatch {
                library_id,
                kind,
                version,
                keys: chunk.to_vec(),
            });
        }
    }
    batches
}

/// Assembles upload data for every library known locally: each personal
/// library plus every group the user may write to
pub fn load_library_data(db: &Database) -> SyncResult<Vec<LibraryData>> {
    let mut libraries = Vec::new();

    for library in db.custom_libraries.values() {
        let library_id = LibraryId::Custom(library.library_type);
        libraries.push(assemble(
            db,
            library_id,
            library.library_type.library_name().to_string(),
            true,
        ));
    }
    for group in db.groups.values().filter(|g| !g.local_only) {
        libraries.push(assemble(
            db,
            LibraryId::Group(group.identifier),
            group.name.clone(),
            group.can_edit_metadata,
        ));
    }
    Ok(libraries)
}

fn assemble(
    db: &Database,
    library_id: LibraryId,
    name: String,
    can_edit_metadata: bool,
) -> LibraryData {
    let (updates, has_upload) = if can_edit_metadata {
        write_batches(db, library_id)
    } else {
        (Vec::new(), false)
    };
    let deletions = if can_edit_metadata {
        delete_batches(db, library_id)
    } else {
        Vec::new()
    };
    LibraryData {
        library_id,
        name,
        can_edit_metadata,
        updates,
        deletions,
        has_upload,
    }
}
