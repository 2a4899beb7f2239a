// crates/storage/src/lib.rs
//! Citestream local storage layer
//!
//! This crate holds the syncable entity model, an in-memory transactional
//! store implementing the storage-gate contract (consistent-snapshot reads,
//! all-or-nothing writes), and the command layer: every mutation of local
//! data goes through a request function in [`requests`], executed inside one
//! atomic transaction.
//!
//! The store keeps entities in indexed tables keyed by `(library, key)` and
//! represents many-to-many relationships (item↔tag) as explicit join rows,
//! so cascade deletes and cycle detection never chase object graphs.

pub mod entities;
pub mod requests;
pub mod schema;
pub mod store;

pub use schema::Schema;
pub use store::{Database, Store};
