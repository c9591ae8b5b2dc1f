//! # Persistent Storage
//!
//! Disk-backed implementations of [`crate::store::XpStore`].

mod redb_store;

pub use redb_store::RedbStore;
