//! # grain-core
//!
//! The deterministic Grain accounting engine - THE LOGIC.
//!
//! An append-only ledger of a fixed-point currency ("Grain"), periodically
//! distributed to participants in proportion to externally computed
//! reputation scores ("Cred"), with per-participant redirection of payouts
//! through personal attributions.
//!
//! ## Architectural Constraints
//!
//! - Pure and synchronous: no async, no network
//! - Deterministic: ordered collections only, no floating point
//! - Exact: amounts are big integers, every distribution sums to its budget
//! - Append-only: balances are a fold over the ledger's event log
//! - Replayable: a distribution is recorded once per epoch, so rerunning
//!   the engine never double-pays

// =============================================================================
// MODULES
// =============================================================================

pub mod accounts;
pub mod allocation;
pub mod attribution;
pub mod cred;
pub mod currency;
pub mod distribution;
pub mod formats;
pub mod grain;
pub mod identity;
pub mod instance;
pub mod ledger;
pub mod policy;
pub mod primitives;
pub mod storage;
pub mod summary;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use grain::GrainAmount;
pub use types::{Epoch, GrainError, IdentityId, TimestampMs};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use accounts::{CredAccount, CredAccountData, accounts_to_json, compute_cred_accounts};
pub use allocation::apportion;
pub use attribution::{PersonalAttribution, PersonalAttributionProportion, PersonalAttributionsMap};
pub use cred::{CredPoint, CredView};
pub use currency::CurrencyDetails;
pub use distribution::{Allocation, Distribution, Receipt, apply_distributions};
pub use identity::Identity;
pub use instance::{DistributionOutcome, GrainInstance};
pub use ledger::{Account, Ledger, LedgerAction, LedgerEvent};
pub use policy::{AllocationPolicy, DistributionPolicy, GrainConfig, PolicyType};
pub use summary::{DistributionSummary, render_distribution};

// =============================================================================
// RE-EXPORTS: Formats and Storage
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::ledger_checksum;
pub use formats::{PersistenceHeader, ledger_from_bytes, ledger_to_bytes};
pub use storage::{DataStorage, DiskStorage, RedbStorage, WritableDataStorage};
