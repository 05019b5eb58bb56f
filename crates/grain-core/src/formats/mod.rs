//! # Formats
//!
//! Binary persistence of the ledger event log.

pub mod persistence;

#[cfg(feature = "crypto-hash")]
pub use persistence::ledger_checksum;
pub use persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, ledger_from_bytes, ledger_to_bytes,
};
