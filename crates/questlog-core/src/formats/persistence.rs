//! # Snapshot Format
//!
//! Binary serialization for ledger snapshots. File I/O lives in the app
//! layer.
//!
//! Format: Header (5 bytes) + postcard-serialized `LedgerSnapshot`.
//! - 4 bytes: Magic ("QLOG")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::primitives;
use crate::store::LedgerSnapshot;
use crate::QuestlogError;

/// Maximum accepted snapshot size (256 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding every snapshot payload.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), QuestlogError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(QuestlogError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(QuestlogError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, QuestlogError> {
        if bytes.len() < HEADER_LEN {
            return Err(QuestlogError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a snapshot to bytes (header + payload).
pub fn snapshot_to_bytes(snapshot: &LedgerSnapshot) -> Result<Vec<u8>, QuestlogError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| QuestlogError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot from bytes.
///
/// Rejects data that is too short, larger than `MAX_SNAPSHOT_SIZE`, or
/// carries the wrong magic or version, all before decoding the payload.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<LedgerSnapshot, QuestlogError> {
    if bytes.len() < HEADER_LEN {
        return Err(QuestlogError::SerializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(QuestlogError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        QuestlogError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
    })
}

/// BLAKE3 hash of serialized snapshot bytes, hex encoded.
#[cfg(feature = "crypto-hash")]
pub fn snapshot_checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, XpStore};
    use crate::UserId;

    fn populated() -> LedgerSnapshot {
        let mut store = MemoryStore::new();
        store.add_xp(&UserId::new("a"), 12, 3).expect("add");
        store.add_xp(&UserId::new("b"), 40, 4).expect("add");
        store.export_snapshot().expect("export")
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let snapshot = populated();
        let bytes1 = snapshot_to_bytes(&snapshot).expect("serialize");
        let restored = snapshot_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = snapshot_to_bytes(&restored).expect("serialize");

        assert_eq!(restored, snapshot);
        assert_eq!(bytes1, bytes2);
        assert_eq!(&bytes1[0..4], primitives::MAGIC_BYTES);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = snapshot_to_bytes(&populated()).expect("serialize");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            snapshot_from_bytes(&bytes),
            Err(QuestlogError::SerializationError(_))
        ));
    }

    #[test]
    fn wrong_version_rejected() {
        let mut bytes = snapshot_to_bytes(&populated()).expect("serialize");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(snapshot_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_data_rejected() {
        assert!(snapshot_from_bytes(b"QLO").is_err());
        let bytes = snapshot_to_bytes(&populated()).expect("serialize");
        assert!(snapshot_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn empty_snapshot_roundtrip() {
        let bytes = snapshot_to_bytes(&LedgerSnapshot::default()).expect("serialize");
        assert_eq!(
            snapshot_from_bytes(&bytes).expect("deserialize"),
            LedgerSnapshot::default()
        );
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn checksum_is_stable() {
        let bytes = snapshot_to_bytes(&populated()).expect("serialize");
        assert_eq!(snapshot_checksum(&bytes), snapshot_checksum(&bytes));
        assert_eq!(snapshot_checksum(&bytes).len(), 64);
    }
}
