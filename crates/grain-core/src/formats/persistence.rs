//! # Persistence Format
//!
//! Binary serialization of the ledger event log.
//!
//! Format: Header (5 bytes) + postcard-serialized `Vec<LedgerEvent>`.
//! - 4 bytes: Magic ("GRLD")
//! - 1 byte: Version
//!
//! Only the events are stored. Loading replays them through the ledger's
//! validation, so a log that decodes but breaks a ledger invariant is
//! rejected as well.
//!
//! Size and header checks run before the payload is decoded.

use crate::ledger::{Ledger, LedgerEvent};
use crate::{GrainError, primitives};

/// Maximum accepted size of a serialized ledger.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 256 * 1024 * 1024; // 256 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes the event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), GrainError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(GrainError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(GrainError::DeserializationError(format!(
                "Unsupported ledger version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GrainError> {
        if bytes.len() < HEADER_SIZE {
            return Err(GrainError::DeserializationError(
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

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a ledger to bytes (header + payload). No file I/O.
pub fn ledger_to_bytes(ledger: &Ledger) -> Result<Vec<u8>, GrainError> {
    let payload = postcard::to_stdvec(&ledger.events())
        .map_err(|e| GrainError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize and replay a ledger. No file I/O.
pub fn ledger_from_bytes(bytes: &[u8]) -> Result<Ledger, GrainError> {
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(GrainError::DeserializationError(format!(
            "Ledger size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let events: Vec<LedgerEvent> = postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        GrainError::DeserializationError(format!("Failed to decode ledger events: {}", e))
    })?;
    Ledger::from_events(events)
}

/// BLAKE3 hex digest of the serialized ledger.
#[cfg(feature = "crypto-hash")]
pub fn ledger_checksum(ledger: &Ledger) -> Result<String, GrainError> {
    let bytes = ledger_to_bytes(ledger)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Allocation, Distribution, Receipt};
    use crate::policy::{AllocationPolicy, PolicyType};
    use crate::{Epoch, GrainAmount};

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        let a = ledger.create_identity("alice", 1).expect("create");
        let b = ledger.create_identity("bob", 2).expect("create");
        ledger.add_alias(a, "discord/alice", 3).expect("alias");
        ledger
            .distribute_grain(Distribution {
                epoch: Epoch::new(0, 100),
                created_ms: 200,
                allocations: vec![Allocation {
                    policy: AllocationPolicy {
                        policy_type: PolicyType::Immediate,
                        budget: GrainAmount::from_whole_grain(10),
                    },
                    receipts: vec![
                        Receipt {
                            id: a,
                            amount: GrainAmount::from_whole_grain(7),
                        },
                        Receipt {
                            id: b,
                            amount: GrainAmount::from_whole_grain(3),
                        },
                    ],
                }],
            })
            .expect("distribute");
        ledger
            .transfer_grain(a, b, GrainAmount::from_whole_grain(1), Some("tip".into()), 300)
            .expect("transfer");
        ledger
    }

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let restored = PersistenceHeader::from_bytes(&header.to_bytes()).expect("parse header");
        assert_eq!(restored, header);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let ledger = sample_ledger();
        let bytes1 = ledger_to_bytes(&ledger).expect("first serialize");
        let restored = ledger_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = ledger_to_bytes(&restored).expect("second serialize");

        assert_eq!(
            bytes1, bytes2,
            "save -> load -> save must produce identical bytes"
        );
        assert_eq!(restored, ledger);
        assert_eq!(
            restored.balance(restored.identity_by_name("bob").expect("bob").id),
            Some(&GrainAmount::from_whole_grain(4))
        );
    }

    #[test]
    fn empty_ledger_roundtrip() {
        let bytes = ledger_to_bytes(&Ledger::new()).expect("serialize");
        assert_eq!(&bytes[..4], primitives::MAGIC_BYTES);
        assert!(ledger_from_bytes(&bytes).expect("load").events().is_empty());
    }

    #[test]
    fn invalid_header_rejected() {
        let mut bytes = ledger_to_bytes(&sample_ledger()).expect("serialize");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(ledger_from_bytes(&bytes).is_err());

        bytes[0..4].copy_from_slice(primitives::MAGIC_BYTES);
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(ledger_from_bytes(&bytes).is_err());

        assert!(ledger_from_bytes(b"GRL").is_err());
    }

    #[test]
    fn truncated_payload_rejected() {
        let bytes = ledger_to_bytes(&sample_ledger()).expect("serialize");
        let result = ledger_from_bytes(&bytes[..bytes.len() - 3]);
        assert!(matches!(result, Err(GrainError::DeserializationError(_))));
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn checksum_tracks_content() {
        let ledger = sample_ledger();
        let first = ledger_checksum(&ledger).expect("hash");
        assert_eq!(first.len(), 64);
        assert_eq!(first, ledger_checksum(&ledger.clone()).expect("hash"));
        assert_ne!(first, ledger_checksum(&Ledger::new()).expect("hash"));
    }
}
