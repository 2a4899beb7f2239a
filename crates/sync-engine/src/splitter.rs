// crates/sync-engine/src/splitter.rs
//! Oversized-annotation splitting
//!
//! Annotation position payloads have a hard service-side size limit. When
//! an upload bounces on it, the offending annotation is replaced by
//! sibling annotations that each carry a slice of the geometry and fit
//! under the limit individually. Siblings are written as if they came
//! from the server (synced state, sync-response change type) but carry a
//! full pending delta, so the next upload pass submits them.

use crate::error::SyncResult;
use citestream_core::{KeyGenerator, LibraryId};
use citestream_storage::entities::{
    field_keys, ChangeType, Item, ItemChange, ObjectChange, Path, PathPoint, Rect, SyncMeta,
    TypedTag,
};
use citestream_storage::requests::items::remove_item_cascading;
use citestream_storage::Database;

/// Maximum stringified size of one annotation position payload
pub const POSITION_SIZE_LIMIT: usize = 65_000;

fn rounded3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn coord_len(value: f64) -> usize {
    format!("{}", rounded3(value)).len()
}

/// Partitions highlight rects into groups whose stringified payload each
/// fits under `limit`. Rects are ordered bottom-up, left-to-right, the
/// order the position payload serializes them in. Returns `None` when the
/// geometry already fits in a single payload.
pub fn split_rects_if_needed(rects: &[Rect], limit: usize) -> Option<Vec<Vec<Rect>>> {
    if rects.is_empty() {
        return None;
    }
    let mut sorted: Vec<Rect> = rects.to_vec();
    sorted.sort_by(|l, r| {
        if l.min_y == r.min_y {
            r.min_x.partial_cmp(&l.min_x).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            l.min_y.partial_cmp(&r.min_y).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    // Accounting mirrors the serialized form: 2 for the outer brackets,
    // per rect 4 coordinate strings plus 6 for brackets and commas.
    let mut count = 2;
    let mut groups: Vec<Vec<Rect>> = Vec::new();
    let mut current: Vec<Rect> = Vec::new();

    for rect in sorted {
        let size = coord_len(rect.min_x)
            + coord_len(rect.min_y)
            + coord_len(rect.max_x)
            + coord_len(rect.max_y)
            + 6;

        if count + size > limit {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            count = 2;
        }
        current.push(rect);
        count += size;
    }
    if !current.is_empty() {
        groups.push(current);
    }

    if groups.len() == 1 {
        return None;
    }
    Some(groups)
}

/// Partitions ink strokes into groups under `limit`, splitting inside a
/// stroke when a single stroke overflows on its own. Stroke sort indices
/// are reassigned per group. Returns `None` when no split is needed.
pub fn split_paths_if_needed(paths: &[Path], limit: usize) -> Option<Vec<Vec<Path>>> {
    if paths.is_empty() {
        return None;
    }
    let mut sorted: Vec<&Path> = paths.iter().collect();
    sorted.sort_by_key(|p| p.sort_index);

    let mut count = 2;
    let mut groups: Vec<Vec<Vec<PathPoint>>> = Vec::new();
    let mut current_lines: Vec<Vec<PathPoint>> = Vec::new();
    let mut current_points: Vec<PathPoint> = Vec::new();

    for path in sorted {
        if count + 3 > limit {
            if !current_points.is_empty() {
                current_lines.push(std::mem::take(&mut current_points));
            }
            if !current_lines.is_empty() {
                groups.push(std::mem::take(&mut current_lines));
            }
            count = 2;
        }
        count += 3;

        for point in &path.points {
            let size = coord_len(point.x) + coord_len(point.y) + 2;

            if count + size > limit {
                if !current_points.is_empty() {
                    current_lines.push(std::mem::take(&mut current_points));
                }
                if !current_lines.is_empty() {
                    groups.push(std::mem::take(&mut current_lines));
                }
                // A fresh group starts mid-stroke, so its count already
                // includes the stroke's own overhead.
                count = 5;
            }
            count += size;
            current_points.push(*point);
        }

        current_lines.push(std::mem::take(&mut current_points));
    }

    if !current_points.is_empty() {
        current_lines.push(current_points);
    }
    if !current_lines.is_empty() {
        groups.push(current_lines);
    }

    if groups.len() == 1 {
        return None;
    }
    Some(
        groups
            .into_iter()
            .map(|lines| {
                lines
                    .into_iter()
                    .enumerate()
                    .map(|(idx, points)| Path {
                        sort_index: idx as i32,
                        points,
                    })
                    .collect()
            })
            .collect(),
    )
}

/// Replaces each oversized annotation with sibling annotations carrying a
/// geometry slice each, then removes the source annotation.
pub fn split_annotations(
    db: &mut Database,
    library_id: LibraryId,
    keys: &[String],
    limit: usize,
) -> SyncResult<()> {
    for key in keys {
        let Ok(item) = db.item(library_id, key) else {
            continue;
        };
        let source = item.clone();
        let mut sibling_count = 0;

        match source.annotation_type() {
            Some(field_keys::annotation_type::HIGHLIGHT)
            | Some(field_keys::annotation_type::UNDERLINE) => {
                if let Some(groups) = split_rects_if_needed(&source.rects, limit) {
                    for rects in groups {
                        let mut sibling = sibling_without_geometry(db, &source);
                        sibling.rects = rects;
                        sibling.changes.push(ObjectChange::new(vec![ItemChange::Rects]));
                        db.insert_item(sibling)?;
                        sibling_count += 1;
                    }
                }
            }
            Some(field_keys::annotation_type::INK) => {
                if let Some(groups) = split_paths_if_needed(&source.paths, limit) {
                    for paths in groups {
                        let mut sibling = sibling_without_geometry(db, &source);
                        sibling.paths = paths;
                        sibling.changes.push(ObjectChange::new(vec![ItemChange::Paths]));
                        db.insert_item(sibling)?;
                        sibling_count += 1;
                    }
                }
            }
            _ => {}
        }

        // The source goes away even when nothing was produced, so a
        // retry loop never resubmits the same oversized payload.
        if sibling_count == 0 {
            log::warn!("annotation split produced no siblings; key={}", key);
        }
        remove_item_cascading(db, library_id, key);
    }
    db.prune_orphaned_tags(library_id);
    Ok(())
}

/// Clones everything off the source annotation except its geometry. The
/// clone gets a fresh key, copied tags and fields (flagged changed), and a
/// pending delta covering parent, fields, type and tags.
fn sibling_without_geometry(db: &mut Database, source: &Item) -> Item {
    let mut sibling = Item::new(KeyGenerator::new_key(), source.library_id, &source.raw_type);
    sibling.base_title = source.base_title.clone();
    sibling.display_title = source.display_title.clone();
    sibling.date_added = source.date_added;
    sibling.date_modified = source.date_modified;
    sibling.parent_key = source.parent_key.clone();
    sibling.trash = source.trash;

    let mut meta = SyncMeta::new_synced(0);
    meta.last_sync_date = None;
    meta.change_type = ChangeType::SyncResponse;
    meta.deleted = source.meta.deleted;
    sibling.meta = meta;
    sibling.changes.push(ObjectChange::new(vec![
        ItemChange::Parent,
        ItemChange::Fields,
        ItemChange::Type,
        ItemChange::Tags,
    ]));

    for field in &source.fields {
        let mut field = field.clone();
        field.changed = true;
        sibling.fields.push(field);
    }

    let tag_rows: Vec<TypedTag> = db
        .typed_tags
        .iter()
        .filter(|t| t.library_id == source.library_id && t.item_key == source.key)
        .cloned()
        .collect();
    for mut row in tag_rows {
        row.item_key = sibling.key.clone();
        db.typed_tags.push(row);
    }

    sibling
}
