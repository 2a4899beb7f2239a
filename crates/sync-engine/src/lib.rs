// crates/sync-engine/src/lib.rs
//! Upload-side synchronization engine
//!
//! Sits on top of the storage command layer and prepares everything an
//! upload round needs:
//! - per-object retry backoff intervals for version reconciliation
//! - write batches of pending changes, parents before children, chunked
//!   to the service's batch limits with their change-id maps
//! - delete batches of tombstoned keys
//! - splitting of annotations whose geometry exceeds the position size
//!   budget into sibling items
//!
//! The actual HTTP transport is a collaborator: it consumes the batches
//! built here and feeds per-batch outcomes back into the storage
//! acknowledgment commands.

mod batching;
mod error;
mod splitter;
mod types;

pub use batching::{delete_batches, load_library_data, write_batches};
pub use error::{SyncError, SyncResult};
pub use splitter::{
    split_annotations, split_paths_if_needed, split_rects_if_needed, POSITION_SIZE_LIMIT,
};
pub use types::{DelayIntervals, DeleteBatch, LibraryData, WriteBatch};
