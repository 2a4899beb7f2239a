// crates/storage/src/entities/mod.rs
//! Syncable entity model
//!
//! Every syncable kind carries the same sync bookkeeping ([`SyncMeta`]) and
//! an append-only list of pending deltas ([`ObjectChange`]) tagged with the
//! field groups they cover. Deltas are cleared only by acknowledgment
//! commands that name the exact identifiers captured at batch-build time.

pub mod collection;
pub mod common;
pub mod field_keys;
pub mod group;
pub mod item;
pub mod item_types;
pub mod library;
pub mod page_index;
pub mod search;
pub mod tag;

pub use collection::{Collection, CollectionChange};
pub use common::{ChangeType, ObjectChange, SyncMeta, SyncState};
pub use group::Group;
pub use item::{Creator, Item, ItemChange, ItemField, Path, PathPoint, Rect};
pub use library::{CustomLibrary, Versions};
pub use page_index::{PageIndex, PageIndexChange};
pub use search::{Search, SearchChange, SearchCondition};
pub use tag::{Tag, TagKind, TypedTag};
