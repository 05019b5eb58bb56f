//! # Policy Configuration
//!
//! Loads `config/grain.toml` from an instance's input storage:
//!
//! ```toml
//! immediate_per_week = 1000
//! balanced_per_week = 500
//! max_simultaneous_distributions = 4   # optional
//! ```
//!
//! Budgets are whole Grain per epoch. A budget of 0 disables its policy.

use grain_core::{DataStorage, DistributionPolicy, GrainConfig, GrainError, primitives};
use tracing::debug;

/// Parse the TOML text of a policy file.
pub fn parse_grain_config(text: &str) -> Result<GrainConfig, GrainError> {
    toml::from_str(text).map_err(|e| {
        GrainError::DeserializationError(format!("{}: {}", primitives::GRAIN_CONFIG_KEY, e))
    })
}

/// Load and validate the distribution policy of an instance.
pub fn load_distribution_policy<S: DataStorage>(
    inputs: &S,
) -> Result<DistributionPolicy, GrainError> {
    let bytes = inputs.get(primitives::GRAIN_CONFIG_KEY)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        GrainError::DeserializationError(format!("{}: {}", primitives::GRAIN_CONFIG_KEY, e))
    })?;
    let config = parse_grain_config(&text)?;
    debug!(?config, "Policy configuration loaded");
    config.to_distribution_policy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use grain_core::{GrainAmount, PolicyType};

    #[test]
    fn parses_full_config() {
        let config = parse_grain_config(
            "immediate_per_week = 1000\nbalanced_per_week = 0\nmax_simultaneous_distributions = 3\n",
        )
        .expect("parse");
        assert_eq!(config.max_simultaneous_distributions, Some(3));

        let policy = config.to_distribution_policy().expect("valid");
        assert_eq!(policy.allocation_policies.len(), 1);
        assert_eq!(policy.allocation_policies[0].policy_type, PolicyType::Immediate);
        assert_eq!(
            policy.allocation_policies[0].budget,
            GrainAmount::from_whole_grain(1000)
        );
    }

    #[test]
    fn rejects_unknown_and_missing_fields() {
        assert!(parse_grain_config("immediate_per_week = 1\n").is_err());
        assert!(
            parse_grain_config("immediate_per_week = 1\nbalanced_per_week = 1\nweekly = 2\n")
                .is_err()
        );
    }
}
