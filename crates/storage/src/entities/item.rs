// crates/storage/src/entities/item.rs
//! The item entity: bibliographic entries, attachments, notes, annotations

use super::common::{
    changed_fields, delete_changes_by_id, ChangeType, ObjectChange, SyncMeta, SyncState,
};
use super::{field_keys, item_types};
use chrono::{DateTime, Utc};
use citestream_core::LibraryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Field groups an item delta can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemChange {
    /// Item type changed
    Type,
    /// Trash flag changed
    Trash,
    /// Parent assignment changed
    Parent,
    /// Collection memberships changed
    Collections,
    /// Field values changed
    Fields,
    /// Tag assignments changed
    Tags,
    /// Creator list changed
    Creators,
    /// Relations changed
    Relations,
    /// Annotation rect geometry changed
    Rects,
    /// Annotation ink paths changed
    Paths,
}

/// A single field value, optionally aliased to a base field key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemField {
    /// Type-specific field key
    pub key: String,
    /// Base key this field aliases (e.g. publication titles)
    pub base_key: Option<String>,
    /// Raw string value
    pub value: String,
    /// True while the value awaits upload
    pub changed: bool,
}

impl ItemField {
    /// Creates an unchanged field
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_key: None,
            value: value.into(),
            changed: false,
        }
    }
}

/// An ordered creator entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// Creator type under the item type's schema
    pub creator_type: String,
    /// Given name, empty for single-field names
    pub first_name: String,
    /// Family name, empty for single-field names
    pub last_name: String,
    /// Single-field name, empty for two-field names
    pub name: String,
    /// Position in the creator list
    pub order_id: i32,
    /// True if this is the primary creator type for the item type
    pub primary: bool,
}

impl Creator {
    /// Name used in summaries
    pub fn summary_name(&self) -> &str {
        if !self.last_name.is_empty() {
            &self.last_name
        } else {
            &self.name
        }
    }
}

/// Axis-aligned annotation rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// One point of an ink path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

/// An ordered ink stroke, exclusively owned by its annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Stroke position within the annotation
    pub sort_index: i32,
    /// Ordered points of the stroke
    pub points: Vec<PathPoint>,
}

/// A typed relation to another object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Relation predicate
    pub predicate: String,
    /// Target URI
    pub url: String,
}

/// An external link attached to the item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link relationship (self, alternate, enclosure)
    pub kind: String,
    /// Target URL
    pub href: String,
    /// Display title
    pub title: String,
    /// Content type of the target
    pub content_type: String,
}

/// Core syncable entity: bibliographic entry, attachment, note or annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable remote id
    pub key: String,
    /// Library this item belongs to
    pub library_id: LibraryId,
    /// Item type name
    pub raw_type: String,
    /// Title as entered
    pub base_title: String,
    /// Title shown in lists, derived from the base title
    pub display_title: String,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    /// Parent item key; chains are walked with cycle detection, never
    /// assumed acyclic
    pub parent_key: Option<String>,
    /// Collection memberships
    pub collection_keys: BTreeSet<String>,
    /// Field values
    pub fields: Vec<ItemField>,
    /// Ordered creators
    pub creators: Vec<Creator>,
    /// Relations to other objects
    pub relations: Vec<Relation>,
    /// External links
    pub links: Vec<Link>,
    /// Annotation rect geometry
    pub rects: Vec<Rect>,
    /// Annotation ink geometry
    pub paths: Vec<Path>,
    /// Item sits in the trash
    pub trash: bool,
    /// Attachment bytes must be uploaded before metadata references them
    pub attachment_needs_sync: bool,
    /// Sync bookkeeping
    pub meta: SyncMeta,
    /// Pending deltas
    pub changes: Vec<ObjectChange<ItemChange>>,
}

impl Item {
    /// Creates an empty item of the given type, created by user action
    pub fn new(key: impl Into<String>, library_id: LibraryId, raw_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            library_id,
            raw_type: raw_type.into(),
            base_title: String::new(),
            display_title: String::new(),
            date_added: now,
            date_modified: now,
            parent_key: None,
            collection_keys: BTreeSet::new(),
            fields: Vec::new(),
            creators: Vec::new(),
            relations: Vec::new(),
            links: Vec::new(),
            rects: Vec::new(),
            paths: Vec::new(),
            trash: false,
            attachment_needs_sync: false,
            meta: SyncMeta::new_user(),
            changes: Vec::new(),
        }
    }

    /// Sets the title and refreshes the derived display title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.base_title = title.into();
        self.update_derived_titles();
    }

    /// Recomputes the display title from the base title
    pub fn update_derived_titles(&mut self) {
        let derived = if self.base_title.is_empty() {
            self.raw_type.clone()
        } else {
            self.base_title.clone()
        };
        if self.display_title != derived {
            self.display_title = derived;
        }
    }

    /// Value of the field with the given key
    pub fn field_value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
    }

    /// Annotation subtype, if this is an annotation with one set
    pub fn annotation_type(&self) -> Option<&str> {
        if self.raw_type != item_types::ANNOTATION {
            return None;
        }
        self.field_value(field_keys::ANNOTATION_TYPE)
    }

    /// True while any delta awaits acknowledgment
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Union of field groups covered by pending deltas
    pub fn changed_fields(&self) -> Vec<ItemChange> {
        changed_fields(&self.changes)
    }

    /// The full significant field-group set for this item's shape
    pub fn significant_change_groups(&self) -> Vec<ItemChange> {
        if self.raw_type == item_types::ANNOTATION {
            let mut groups = vec![
                ItemChange::Parent,
                ItemChange::Fields,
                ItemChange::Type,
                ItemChange::Tags,
            ];
            if !self.rects.is_empty() {
                groups.push(ItemChange::Rects);
            }
            if !self.paths.is_empty() {
                groups.push(ItemChange::Paths);
            }
            return groups;
        }

        let mut groups = vec![ItemChange::Type, ItemChange::Fields, ItemChange::Tags];
        if !self.creators.is_empty() {
            groups.push(ItemChange::Creators);
        }
        if !self.collection_keys.is_empty() {
            groups.push(ItemChange::Collections);
        }
        if self.parent_key.is_some() {
            groups.push(ItemChange::Parent);
        }
        if self.trash {
            groups.push(ItemChange::Trash);
        }
        if !self.relations.is_empty() {
            groups.push(ItemChange::Relations);
        }
        groups
    }

    /// Appends a delta covering the full significant field-group set.
    ///
    /// Idempotent: when pending deltas already cover every significant
    /// group, no new delta is appended, so double-marking never produces a
    /// second acknowledgable entry. Child recursion is the caller's job.
    pub fn mark_as_changed_local(&mut self) {
        let groups = self.significant_change_groups();
        let pending = self.changed_fields();
        let fully_dirty = !groups.is_empty() && groups.iter().all(|g| pending.contains(g));

        if !fully_dirty {
            self.changes.push(ObjectChange::new(groups));
        }

        self.meta.change_type = ChangeType::User;
        self.meta.deleted = false;
        self.meta.version = 0;

        for field in &mut self.fields {
            if !field.value.is_empty() {
                field.changed = true;
            }
        }

        if self.raw_type == item_types::ATTACHMENT
            && self.field_value(field_keys::LINK_MODE) == Some(field_keys::LINK_MODE_IMPORTED_FILE)
        {
            self.attachment_needs_sync = true;
        }
    }

    /// Removes exactly the acknowledged delta subset and clears field flags
    pub fn delete_changes(&mut self, identifiers: &[Uuid]) {
        delete_changes_by_id(&mut self.changes, identifiers);
        self.meta.change_type = ChangeType::SyncResponse;
        for field in &mut self.fields {
            field.changed = false;
        }
    }

    /// Clears all deltas; used when remote data is authoritative
    pub fn delete_all_changes(&mut self) {
        if !self.is_changed() {
            return;
        }
        self.changes.clear();
        self.meta.change_type = ChangeType::Sync;
        for field in &mut self.fields {
            field.changed = false;
        }
    }

    /// Marks this item as needing a re-fetch
    pub fn mark_outdated(&mut self) {
        self.meta.sync_state = SyncState::Outdated;
    }

    /// Summary of the creator list ("Doe", "Doe and Roe", "Doe et al.")
    pub fn creator_summary(&self) -> Option<String> {
        let mut sorted: Vec<&Creator> = self.creators.iter().collect();
        sorted.sort_by_key(|c| c.order_id);
        match sorted.len() {
            0 => None,
            1 => Some(sorted[0].summary_name().to_string()),
            2 => Some(format!(
                "{} and {}",
                sorted[0].summary_name(),
                sorted[1].summary_name()
            )),
            _ => Some(format!("{} et al.", sorted[0].summary_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citestream_core::{CustomLibraryType, KeyGenerator};

    fn test_library() -> LibraryId {
        LibraryId::Custom(CustomLibraryType::MyLibrary)
    }

    fn test_item(raw_type: &str) -> Item {
        Item::new(KeyGenerator::new_key(), test_library(), raw_type)
    }

    #[test]
    fn test_new_item_has_no_changes() {
        let item = test_item("book");
        assert!(!item.is_changed());
        assert_eq!(item.meta.version, 0);
        assert!(!item.meta.deleted);
    }

    #[test]
    fn test_mark_as_changed_captures_full_group_set() {
        let mut item = test_item("book");
        item.fields.push(ItemField::new("title", "Dune"));
        item.mark_as_changed_local();

        let fields = item.changed_fields();
        assert!(fields.contains(&ItemChange::Type));
        assert!(fields.contains(&ItemChange::Fields));
        assert!(fields.contains(&ItemChange::Tags));
        assert!(!fields.contains(&ItemChange::Creators));
        assert_eq!(item.meta.change_type, ChangeType::User);
        assert!(item.fields[0].changed);
    }

    #[test]
    fn test_mark_as_changed_is_idempotent() {
        let mut item = test_item("book");
        item.mark_as_changed_local();
        assert_eq!(item.changes.len(), 1);
        item.mark_as_changed_local();
        assert_eq!(item.changes.len(), 1, "no duplicate delta for fully-dirty item");
    }

    #[test]
    fn test_mark_as_changed_appends_for_new_groups() {
        let mut item = test_item("book");
        item.mark_as_changed_local();
        // A new significant group appears after the first delta.
        item.trash = true;
        item.mark_as_changed_local();
        assert_eq!(item.changes.len(), 2);
        assert!(item.changed_fields().contains(&ItemChange::Trash));
    }

    #[test]
    fn test_annotation_group_set() {
        let mut item = test_item(item_types::ANNOTATION);
        item.fields.push(ItemField::new(
            field_keys::ANNOTATION_TYPE,
            field_keys::annotation_type::HIGHLIGHT,
        ));
        item.rects.push(Rect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 10.0,
            max_y: 10.0,
        });
        let groups = item.significant_change_groups();
        assert!(groups.contains(&ItemChange::Parent));
        assert!(groups.contains(&ItemChange::Rects));
        assert!(!groups.contains(&ItemChange::Paths));
        assert!(!groups.contains(&ItemChange::Creators));
    }

    #[test]
    fn test_attachment_marks_upload_needed() {
        let mut item = test_item(item_types::ATTACHMENT);
        item.fields.push(ItemField::new(
            field_keys::LINK_MODE,
            field_keys::LINK_MODE_IMPORTED_FILE,
        ));
        item.mark_as_changed_local();
        assert!(item.attachment_needs_sync);
    }

    #[test]
    fn test_delete_changes_keeps_later_deltas() {
        let mut item = test_item("book");
        item.mark_as_changed_local();
        let first_id = item.changes[0].identifier;
        item.trash = true;
        item.mark_as_changed_local();

        item.delete_changes(&[first_id]);
        assert_eq!(item.changes.len(), 1);
        assert_eq!(item.meta.change_type, ChangeType::SyncResponse);
    }

    #[test]
    fn test_delete_all_changes() {
        let mut item = test_item("book");
        item.fields.push(ItemField::new("title", "Dune"));
        item.mark_as_changed_local();
        item.delete_all_changes();
        assert!(!item.is_changed());
        assert_eq!(item.meta.change_type, ChangeType::Sync);
        assert!(!item.fields[0].changed);
    }

    #[test]
    fn test_creator_summary() {
        let mut item = test_item("book");
        assert!(item.creator_summary().is_none());

        item.creators.push(Creator {
            creator_type: "author".to_string(),
            first_name: "Frank".to_string(),
            last_name: "Herbert".to_string(),
            name: String::new(),
            order_id: 0,
            primary: true,
        });
        assert_eq!(item.creator_summary().as_deref(), Some("Herbert"));

        item.creators.push(Creator {
            creator_type: "author".to_string(),
            first_name: String::new(),
            last_name: "Anderson".to_string(),
            name: String::new(),
            order_id: 1,
            primary: true,
        });
        assert_eq!(
            item.creator_summary().as_deref(),
            Some("Herbert and Anderson")
        );
    }

    #[test]
    fn test_display_title_falls_back_to_type() {
        let mut item = test_item("note");
        item.update_derived_titles();
        assert_eq!(item.display_title, "note");
        item.set_title("Reading notes");
        assert_eq!(item.display_title, "Reading notes");
    }
}
