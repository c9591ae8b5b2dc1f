//! # Formats
//!
//! Serialization formats for exported ledger data.

pub mod persistence;

#[cfg(feature = "crypto-hash")]
pub use persistence::snapshot_checksum;
pub use persistence::{MAX_SNAPSHOT_SIZE, SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
