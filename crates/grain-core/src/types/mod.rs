//! # Core Type Definitions
//!
//! This module contains the small shared types of the Grain engine:
//! - Identifiers and time (`IdentityId`, `TimestampMs`, `Epoch`)
//! - Error types (`GrainError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer or exact decimal values only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// TIME
// =============================================================================

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// A half-open time interval `[start_ms, end_ms)`.
///
/// Epochs are the unit of distribution scheduling. They are ordered by
/// start time first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch {
    pub start_ms: TimestampMs,
    pub end_ms: TimestampMs,
}

impl Epoch {
    #[must_use]
    pub const fn new(start_ms: TimestampMs, end_ms: TimestampMs) -> Self {
        Self { start_ms, end_ms }
    }

    /// An epoch is completed once its end precedes `now`.
    #[must_use]
    pub const fn is_completed(&self, now: TimestampMs) -> bool {
        self.end_ms < now
    }
}

// =============================================================================
// IDENTITY IDENTIFIER
// =============================================================================

/// Opaque, immutable identifier of a participant. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    /// Mint a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build an identifier from a fixed integer. Useful for fixtures.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdentityId {
    type Err = GrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| GrainError::InvalidIdentityId(s.to_string()))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Grain engine.
///
/// - No silent failures
/// - Use `Result<T, GrainError>` for fallible operations
/// - One variant per failure kind so callers can branch without parsing
///   messages
#[derive(Debug, Error)]
pub enum GrainError {
    // -------------------------------------------------------------------------
    // Personal attribution validation
    // -------------------------------------------------------------------------
    /// More than one attribution for the same (from, to) pair.
    #[error("More than one attribution found from [{from}] to [{to}]")]
    DuplicateAttribution { from: IdentityId, to: IdentityId },

    /// Proportion timestamps decrease within one attribution.
    #[error("Personal attribution proportions not in chronological order for [{from}] to [{to}]")]
    AttributionOutOfOrder { from: IdentityId, to: IdentityId },

    /// A proportion value outside [0, 1].
    #[error(
        "Personal attribution proportion value must be between 0 and 1, inclusive. Found [{value}] for [{from}] to [{to}]"
    )]
    ProportionOutOfRange {
        from: IdentityId,
        to: IdentityId,
        value: Decimal,
    },

    /// A participant redirects more than 100% of an epoch.
    #[error(
        "Sum of personal attributions from [{from}] for epoch [{epoch_start}] is greater than 1. Found: [{sum}]"
    )]
    OverAttribution {
        from: IdentityId,
        epoch_start: TimestampMs,
        sum: Decimal,
    },

    /// Lookup of an attribution pair that does not exist.
    #[error("Could not find personal attribution from [{from}] to [{to}]")]
    AttributionNotFound { from: IdentityId, to: IdentityId },

    // -------------------------------------------------------------------------
    // Identities and ledger
    // -------------------------------------------------------------------------
    /// A string could not be parsed as an identity id.
    #[error("Invalid identity id: {0}")]
    InvalidIdentityId(String),

    /// A username does not follow the naming rules.
    #[error("Invalid username: {0}")]
    InvalidName(String),

    /// An identity with this id already exists.
    #[error("Identity already exists: {0}")]
    DuplicateIdentity(IdentityId),

    /// The name is already used by another identity.
    #[error("Username already taken: {0}")]
    NameTaken(String),

    /// The alias is empty or already claimed.
    #[error("Alias unavailable: {0}")]
    AliasTaken(String),

    /// The ledger has no identity with this id.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(IdentityId),

    /// No identity carries this name.
    #[error("No identity named: {0}")]
    UnknownName(String),

    /// A distribution for this epoch is already in the ledger.
    #[error("Distribution already exists for epoch starting at {epoch_start}")]
    DuplicateDistribution { epoch_start: TimestampMs },

    /// An event is older than the last event in the ledger.
    #[error("Event timestamp {timestamp} precedes last ledger timestamp {last}")]
    TimestampRegression {
        timestamp: TimestampMs,
        last: TimestampMs,
    },

    /// A debit larger than the account balance.
    #[error("Insufficient balance for {id}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        id: IdentityId,
        balance: String,
        requested: String,
    },

    /// Grain subtraction would go below zero.
    #[error("Grain underflow: {minuend} - {subtrahend}")]
    GrainUnderflow { minuend: String, subtrahend: String },

    /// A grain string that cannot be parsed.
    #[error("Invalid grain amount: {0}")]
    InvalidAmount(String),

    /// A transfer memo over the length limit.
    #[error("Memo too long: {len} bytes (max {max})")]
    MemoTooLong { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Cred input and policy
    // -------------------------------------------------------------------------
    /// The cred view is malformed.
    #[error("Invalid cred view: {0}")]
    InvalidCredView(String),

    /// A negative weight was supplied to an apportionment.
    #[error("Negative weight {weight} for {id}")]
    NegativeWeight { id: IdentityId, weight: Decimal },

    /// A policy budget is negative.
    #[error("Budget for {policy} must be non-negative, got {value}")]
    NegativeBudget { policy: String, value: i64 },

    /// The policy configuration is otherwise malformed.
    #[error("Invalid distribution policy: {0}")]
    InvalidPolicy(String),

    // -------------------------------------------------------------------------
    // Storage and formats
    // -------------------------------------------------------------------------
    /// No value is stored under the key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The key resolves outside of the storage base location.
    #[error("Path construction error; possible path traversal attack: {0}")]
    PathTraversal(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
