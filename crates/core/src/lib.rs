// crates/core/src/lib.rs
//! Shared types and errors for the Citestream engine
//!
//! This crate holds the identifiers and the error taxonomy that every other
//! crate in the workspace builds on:
//! - Library identifiers (personal library vs. shared group)
//! - Object key generation (stable 8-character remote ids)
//! - The error kinds commands raise, distinct enough that batch callers can
//!   classify per-item failures vs. fatal aborts

pub mod error;
pub mod types;

pub use error::{DataError, Result};
pub use types::{CustomLibraryType, KeyGenerator, LibraryId, SyncMode, SyncObjectKind};
