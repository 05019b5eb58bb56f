//! # Currency Details
//!
//! How an instance names its currency in reports. Read from
//! `config/currency_details.json`; every field is optional.

use crate::{GrainAmount, GrainError, primitives};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyDetails {
    #[serde(alias = "currencyName")]
    pub name: String,
    /// Appended to every displayed amount, e.g. `12.50g`.
    #[serde(alias = "currencySuffix")]
    pub suffix: String,
}

impl Default for CurrencyDetails {
    fn default() -> Self {
        Self {
            name: "Grain".to_string(),
            suffix: "g".to_string(),
        }
    }
}

impl CurrencyDetails {
    pub fn from_json(bytes: &[u8]) -> Result<Self, GrainError> {
        serde_json::from_slice(bytes)
            .map_err(|e| GrainError::DeserializationError(format!("currency details: {e}")))
    }

    /// `amount` at display precision followed by the suffix.
    #[must_use]
    pub fn format(&self, amount: &GrainAmount) -> String {
        format!("{}{}", amount.format(primitives::DISPLAY_DECIMALS), self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back() {
        let details = CurrencyDetails::from_json(br#"{"name": "Seeds"}"#).expect("parse");
        assert_eq!(details.name, "Seeds");
        assert_eq!(details.suffix, "g");
        assert_eq!(CurrencyDetails::from_json(b"{}").expect("parse"), CurrencyDetails::default());
    }

    #[test]
    fn camel_case_keys_accepted() {
        let details =
            CurrencyDetails::from_json(br#"{"currencyName": "Seeds", "currencySuffix": " SEED"}"#)
                .expect("parse");
        assert_eq!(details.name, "Seeds");
        assert_eq!(details.format(&GrainAmount::from_whole_grain(3)), "3.00 SEED");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            CurrencyDetails::from_json(b"[1, 2]"),
            Err(GrainError::DeserializationError(_))
        ));
    }
}
