//! # Distribution Policy
//!
//! `GrainConfig` is the user-facing configuration (whole-grain weekly
//! budgets). `DistributionPolicy` is its validated form: only clauses with
//! a positive budget are kept.

use crate::{GrainAmount, GrainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a clause weighs participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Cred earned in the distributed epoch only.
    Immediate,
    /// All-time cred up to and including the distributed epoch.
    Balanced,
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("immediate"),
            Self::Balanced => f.write_str("balanced"),
        }
    }
}

/// One clause of a policy: a weighting and its per-epoch budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    pub policy_type: PolicyType,
    pub budget: GrainAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPolicy {
    pub allocation_policies: Vec<AllocationPolicy>,
    /// `None` means unbounded.
    pub max_simultaneous_distributions: Option<usize>,
}

/// Raw policy configuration, as written in `config/grain.toml`.
///
/// Budgets are signed so that negative values reach validation and fail
/// with a typed error instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrainConfig {
    pub immediate_per_week: i64,
    pub balanced_per_week: i64,
    #[serde(default)]
    pub max_simultaneous_distributions: Option<i64>,
}

impl GrainConfig {
    pub fn to_distribution_policy(&self) -> Result<DistributionPolicy, GrainError> {
        let clauses = [
            (PolicyType::Immediate, self.immediate_per_week),
            (PolicyType::Balanced, self.balanced_per_week),
        ];

        let mut allocation_policies = Vec::new();
        for (policy_type, per_week) in clauses {
            let whole = u64::try_from(per_week).map_err(|_| GrainError::NegativeBudget {
                policy: policy_type.to_string(),
                value: per_week,
            })?;
            if whole > 0 {
                allocation_policies.push(AllocationPolicy {
                    policy_type,
                    budget: GrainAmount::from_whole_grain(whole),
                });
            }
        }

        let max_simultaneous_distributions = match self.max_simultaneous_distributions {
            None => None,
            Some(n) if n > 0 => Some(usize::try_from(n).map_err(|_| {
                GrainError::InvalidPolicy(format!("max_simultaneous_distributions too large: {n}"))
            })?),
            Some(n) => {
                return Err(GrainError::InvalidPolicy(format!(
                    "max_simultaneous_distributions must be positive, got {n}"
                )));
            }
        };

        Ok(DistributionPolicy {
            allocation_policies,
            max_simultaneous_distributions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(immediate: i64, balanced: i64, max: Option<i64>) -> GrainConfig {
        GrainConfig {
            immediate_per_week: immediate,
            balanced_per_week: balanced,
            max_simultaneous_distributions: max,
        }
    }

    #[test]
    fn zero_budgets_are_disabled() {
        let policy = config(100, 0, None).to_distribution_policy().expect("valid");
        assert_eq!(policy.allocation_policies.len(), 1);
        assert_eq!(policy.allocation_policies[0].policy_type, PolicyType::Immediate);
        assert_eq!(
            policy.allocation_policies[0].budget,
            GrainAmount::from_whole_grain(100)
        );
        assert_eq!(policy.max_simultaneous_distributions, None);
    }

    #[test]
    fn negative_budget_rejected() {
        let result = config(10, -1, None).to_distribution_policy();
        assert!(matches!(
            result,
            Err(GrainError::NegativeBudget { value: -1, .. })
        ));
    }

    #[test]
    fn non_positive_cap_rejected() {
        assert!(matches!(
            config(1, 1, Some(0)).to_distribution_policy(),
            Err(GrainError::InvalidPolicy(_))
        ));
        let capped = config(1, 1, Some(2)).to_distribution_policy().expect("valid");
        assert_eq!(capped.max_simultaneous_distributions, Some(2));
        assert_eq!(capped.allocation_policies.len(), 2);
    }

    #[test]
    fn policy_type_names() {
        assert_eq!(PolicyType::Immediate.to_string(), "immediate");
        let json = serde_json::to_string(&PolicyType::Balanced).expect("serialize");
        assert_eq!(json, "\"balanced\"");
    }
}
