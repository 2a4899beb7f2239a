// crates/core/src/types/library.rs
//! Library identifiers
//!
//! Every syncable object belongs to exactly one library: the user's
//! personal library or a shared group identified by its numeric id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a custom (non-group) library
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CustomLibraryType {
    /// The user's personal library
    MyLibrary,
}

impl CustomLibraryType {
    /// Human-readable library name
    pub fn library_name(&self) -> &'static str {
        match self {
            Self::MyLibrary => "My Library",
        }
    }
}

/// Identifies the library an object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LibraryId {
    /// Personal library of a given type
    Custom(CustomLibraryType),
    /// Shared group library
    Group(i32),
}

impl LibraryId {
    /// Returns true for group libraries
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Group id, if this is a group library
    pub fn group_id(&self) -> Option<i32> {
        match self {
            Self::Group(id) => Some(*id),
            Self::Custom(_) => None,
        }
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(kind) => write!(f, "{}", kind.library_name()),
            Self::Group(id) => write!(f, "group:{id}"),
        }
    }
}
