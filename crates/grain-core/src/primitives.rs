//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Grain engine.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Number of decimal places of one Grain.
///
/// - 1 Grain = 10^18 base units.
/// - All arithmetic happens on base units.
pub const GRAIN_DECIMALS: u32 = 18;

/// Decimal places shown by the default `Display` of an amount.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Magic bytes for the ledger binary format header.
///
/// - File Header = Magic Bytes ("GRLD") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"GRLD";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// One week in milliseconds; the default epoch length of cred views.
pub const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for usernames and aliases.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum length for transfer memos.
pub const MAX_MEMO_LENGTH: usize = 4096;

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Ledger event log (state storage).
pub const LEDGER_KEY: &str = "data/ledger.bin";

/// Cred account projection (state storage).
pub const ACCOUNTS_KEY: &str = "output/accounts.json";

/// Externally computed cred view (input storage).
pub const CRED_VIEW_KEY: &str = "output/cred_view.json";

/// Personal attribution configuration (input storage).
pub const PERSONAL_ATTRIBUTIONS_KEY: &str = "config/personal_attributions.json";

/// Distribution policy configuration (input storage).
pub const GRAIN_CONFIG_KEY: &str = "config/grain.toml";

/// Currency name and suffix for reports (input storage, optional).
pub const CURRENCY_DETAILS_KEY: &str = "config/currency_details.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"GRLD");
    }

    #[test]
    fn week_is_seven_days() {
        assert_eq!(WEEK_MS, 604_800_000);
    }
}
