// crates/core/src/error.rs
//! Error taxonomy for storage commands and sync reconciliation
//!
//! Each kind is distinct on purpose: batch ingestion catches the per-item
//! kinds (`ItemDeleted`, `ItemChanged`, creator schema violations) into a
//! structured report while anything unclassified aborts the whole batch.

use thiserror::Error;

/// Result type used throughout the workspace
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by storage commands
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Requested object does not exist; caller decides fatal vs. ignorable
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Payload is missing the data needed to form a primary key
    #[error("primary key unavailable for incoming object")]
    PrimaryKeyUnavailable,

    /// Creation guard tripped on a duplicate key
    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: &'static str, key: String },

    /// A derived field value disagrees with its inputs
    #[error("incorrect derived value: {0}")]
    IncorrectDerivedValue(String),

    /// Ingestion conflict: local object is tombstoned while the remote
    /// payload still updates it
    #[error("item {key} deleted locally")]
    ItemDeleted { key: String },

    /// Ingestion conflict: local object has unacknowledged user changes
    #[error("item {key} changed locally")]
    ItemChanged { key: String },

    /// Creator type not valid for this item type under the schema
    #[error("invalid creator '{creator_type}' on item {item_key}")]
    InvalidCreator {
        item_key: String,
        creator_type: String,
    },

    /// No creator on the item survived schema validation
    #[error("no valid creators on {item_type} item {item_key}")]
    NoValidCreators {
        item_key: String,
        item_type: String,
    },
}

impl DataError {
    /// True for the conflict kinds ingestion collects per item instead of
    /// aborting the batch
    pub fn is_item_conflict(&self) -> bool {
        matches!(self, Self::ItemDeleted { .. } | Self::ItemChanged { .. })
    }

    /// True for creator schema violations
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCreator { .. } | Self::NoValidCreators { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = DataError::NotFound {
            entity: "Item",
            key: "ABCD2345".to_string(),
        };
        assert!(err.to_string().contains("Item not found"));
        assert!(err.to_string().contains("ABCD2345"));
    }

    #[test]
    fn test_conflict_classification() {
        assert!(DataError::ItemDeleted {
            key: "K".to_string()
        }
        .is_item_conflict());
        assert!(DataError::ItemChanged {
            key: "K".to_string()
        }
        .is_item_conflict());
        assert!(!DataError::PrimaryKeyUnavailable.is_item_conflict());
    }

    #[test]
    fn test_schema_violation_classification() {
        let err = DataError::InvalidCreator {
            item_key: "K".to_string(),
            creator_type: "composer".to_string(),
        };
        assert!(err.is_schema_violation());
        assert!(!err.is_item_conflict());
    }
}
