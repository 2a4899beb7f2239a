// crates/storage/src/schema.rs
//! Item-type schema service
//!
//! Explicitly constructed and passed into the commands that need it; there
//! is no process-wide schema singleton. Only the creator portion of the
//! schema matters to this engine: which creator types an item type accepts
//! and which of them is primary.

use std::collections::BTreeMap;

/// One creator type an item type accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorSchema {
    /// Creator type name
    pub creator_type: String,
    /// True for the item type's primary creator
    pub primary: bool,
}

/// Creator schemas per item type
#[derive(Debug, Clone, Default)]
pub struct Schema {
    creators: BTreeMap<String, Vec<CreatorSchema>>,
}

impl Schema {
    /// Empty schema; every creator-bearing item type is unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema covering the common bibliographic item types, for use when no
    /// downloaded schema is available
    pub fn bundled() -> Self {
        let mut schema = Self::new();
        schema.add_item_type(
            "book",
            &[
                ("author", true),
                ("contributor", false),
                ("editor", false),
                ("seriesEditor", false),
                ("translator", false),
            ],
        );
        schema.add_item_type(
            "journalArticle",
            &[
                ("author", true),
                ("contributor", false),
                ("editor", false),
                ("reviewedAuthor", false),
                ("translator", false),
            ],
        );
        schema.add_item_type(
            "bookSection",
            &[
                ("author", true),
                ("bookAuthor", false),
                ("contributor", false),
                ("editor", false),
                ("seriesEditor", false),
                ("translator", false),
            ],
        );
        schema.add_item_type(
            "conferencePaper",
            &[
                ("author", true),
                ("contributor", false),
                ("editor", false),
                ("seriesEditor", false),
                ("translator", false),
            ],
        );
        schema.add_item_type(
            "thesis",
            &[("author", true), ("contributor", false)],
        );
        schema.add_item_type(
            "report",
            &[
                ("author", true),
                ("contributor", false),
                ("seriesEditor", false),
                ("translator", false),
            ],
        );
        schema.add_item_type(
            "webpage",
            &[("author", true), ("contributor", false), ("translator", false)],
        );
        schema.add_item_type(
            "document",
            &[
                ("author", true),
                ("contributor", false),
                ("editor", false),
                ("reviewedAuthor", false),
                ("translator", false),
            ],
        );
        schema
    }

    /// Registers the creator types an item type accepts
    pub fn add_item_type(&mut self, item_type: &str, creators: &[(&str, bool)]) {
        self.creators.insert(
            item_type.to_string(),
            creators
                .iter()
                .map(|(creator_type, primary)| CreatorSchema {
                    creator_type: (*creator_type).to_string(),
                    primary: *primary,
                })
                .collect(),
        );
    }

    /// Creator types valid for an item type, `None` for unknown types
    pub fn creators(&self, item_type: &str) -> Option<&[CreatorSchema]> {
        self.creators.get(item_type).map(|v| v.as_slice())
    }

    /// True when `creator_type` is valid for `item_type`
    pub fn is_valid_creator(&self, item_type: &str, creator_type: &str) -> bool {
        self.creators(item_type)
            .map(|creators| creators.iter().any(|c| c.creator_type == creator_type))
            .unwrap_or(false)
    }

    /// The primary creator type for an item type
    pub fn primary_creator(&self, item_type: &str) -> Option<&CreatorSchema> {
        self.creators(item_type)?.iter().find(|c| c.primary)
    }

    /// True when `creator_type` is the primary creator for `item_type`
    pub fn creator_is_primary(&self, item_type: &str, creator_type: &str) -> bool {
        self.primary_creator(item_type)
            .map(|c| c.creator_type == creator_type)
            .unwrap_or(false)
    }
}
