// crates/storage/src/entities/tag.rs
//! Tags and the typed item↔tag join

use citestream_core::LibraryId;
use serde::{Deserialize, Serialize};

/// Provenance of a tag assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
    /// Assigned by hand
    Manual,
    /// Extracted automatically during import
    Automatic,
}

impl TagKind {
    /// Wire representation used in update parameters
    pub fn as_int(&self) -> i32 {
        match self {
            Self::Manual => 0,
            Self::Automatic => 1,
        }
    }
}

/// A tag within one library, identified by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name; unique per library
    pub name: String,
    /// Library this tag belongs to
    pub library_id: LibraryId,
    /// Display color, empty when unset
    pub color: String,
    /// Manual ordering among colored tags
    pub order: i32,
}

impl Tag {
    /// Creates an uncolored tag
    pub fn new(name: impl Into<String>, library_id: LibraryId) -> Self {
        Self {
            name: name.into(),
            library_id,
            color: String::new(),
            order: 0,
        }
    }

    /// True when the tag carries no color; such tags are eligible for
    /// cleanup once their last item association disappears
    pub fn is_colorless(&self) -> bool {
        self.color.is_empty()
    }
}

/// Join row assigning one tag to one item, with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedTag {
    /// Tag name
    pub tag_name: String,
    /// Item the tag is assigned to
    pub item_key: String,
    /// Library scope of both sides
    pub library_id: LibraryId,
    /// Assignment provenance
    pub kind: TagKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use citestream_core::CustomLibraryType;

    #[test]
    fn test_tag_kind_wire_values() {
        assert_eq!(TagKind::Manual.as_int(), 0);
        assert_eq!(TagKind::Automatic.as_int(), 1);
    }

    #[test]
    fn test_colorless_detection() {
        let library = LibraryId::Custom(CustomLibraryType::MyLibrary);
        let mut tag = Tag::new("rust", library);
        assert!(tag.is_colorless());
        tag.color = "#FF0000".to_string();
        assert!(!tag.is_colorless());
    }
}
