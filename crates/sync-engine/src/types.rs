// crates/sync-engine/src/types.rs
//! Core sync types and data structures

use chrono::Duration;
use citestream_core::{LibraryId, SyncObjectKind};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Backoff table for per-object re-fetch delays, indexed by retry count.
///
/// Lookups cap at the last interval, so escalation levels off at the
/// longest configured delay instead of ever giving up.
#[derive(Debug, Clone)]
pub struct DelayIntervals {
    intervals: Vec<Duration>,
}

impl DelayIntervals {
    /// Builds a table from explicit intervals; at least one is required,
    /// an empty input falls back to the defaults
    pub fn new(intervals: Vec<Duration>) -> Self {
        if intervals.is_empty() {
            return Self::default();
        }
        Self { intervals }
    }

    /// Delay to wait after the given number of failed attempts
    pub fn delay(&self, retries: i32) -> Duration {
        let idx = (retries.max(0) as usize).min(self.intervals.len() - 1);
        self.intervals[idx]
    }

    /// The raw interval table, for handing to version reconciliation
    pub fn as_slice(&self) -> &[Duration] {
        &self.intervals
    }
}

impl Default for DelayIntervals {
    fn default() -> Self {
        Self {
            intervals: vec![
                Duration::seconds(30),
                Duration::minutes(1),
                Duration::minutes(5),
                Duration::minutes(30),
                Duration::hours(1),
            ],
        }
    }
}

/// One bounded group of pending object changes for a single upload call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteBatch {
    pub library_id: LibraryId,
    pub kind: SyncObjectKind,
    /// Library version the upload is conditional on
    pub version: i32,
    /// Update-parameter maps in upload order
    pub parameters: Vec<Map<String, Value>>,
    /// Change identifiers per key, echoed back at acknowledgment time
    pub change_ids: BTreeMap<String, Vec<Uuid>>,
}

impl WriteBatch {
    /// Maximum object count per write batch
    pub const MAX_COUNT: usize = 50;

    /// Object keys in this batch, in upload order
    pub fn keys(&self) -> Vec<String> {
        self.parameters
            .iter()
            .filter_map(|p| {
                p.get("key")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| p.keys().next().cloned())
            })
            .collect()
    }
}

/// One bounded group of tombstoned keys for a single delete call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteBatch {
    pub library_id: LibraryId,
    pub kind: SyncObjectKind,
    /// Library version the deletion is conditional on
    pub version: i32,
    pub keys: Vec<String>,
}

impl DeleteBatch {
    /// Maximum key count per delete batch
    pub const MAX_COUNT: usize = 25;
}

/// Everything one library contributes to an upload round
#[derive(Debug, Clone)]
pub struct LibraryData {
    pub library_id: LibraryId,
    /// Display name of the library
    pub name: String,
    /// Whether the current user may push metadata changes
    pub can_edit_metadata: bool,
    /// Pending write batches in kind order
    pub updates: Vec<WriteBatch>,
    /// Pending delete batches in kind order
    pub deletions: Vec<DeleteBatch>,
    /// A changed attachment still needs its bytes uploaded
    pub has_upload: bool,
}

impl LibraryData {
    /// True when this library has nothing to upload
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletions.is_empty() && !self.has_upload
    }
}
