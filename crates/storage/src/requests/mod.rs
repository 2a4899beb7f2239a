// crates/storage/src/requests/mod.rs
//! Command layer
//!
//! Every operation on local data is a free function over the transaction
//! handle (`&Database` for reads, `&mut Database` for writes), executed
//! inside [`crate::Store::read`] or [`crate::Store::write`]. Commands take
//! explicit inputs and call each other directly to build compound
//! operations inside one transaction; any error rolls the whole
//! transaction back.

pub mod collections;
pub mod deletions;
pub mod items;
pub mod mark_changed;
pub mod mark_synced;
pub mod searches;
pub mod store_response;
pub mod sync_versions;
pub mod update_parameters;
