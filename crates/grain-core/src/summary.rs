//! # Distribution Summaries
//!
//! Aggregates and plain-text reports for a batch of distributions.

use crate::GrainAmount;
use crate::currency::CurrencyDetails;
use crate::distribution::{Distribution, Receipt};
use crate::ledger::Ledger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Receipts listed per allocation in a report.
pub const TOP_RECEIPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub total_distributed: GrainAmount,
    /// Distinct identities receiving grain across all distributions.
    pub recipient_count: usize,
    pub distribution_count: usize,
}

impl DistributionSummary {
    #[must_use]
    pub fn from_distributions(distributions: &[Distribution]) -> Self {
        let recipients: BTreeSet<_> = distributions
            .iter()
            .flat_map(Distribution::receipts)
            .map(|r| r.id)
            .collect();
        Self {
            total_distributed: distributions.iter().map(Distribution::total).sum(),
            recipient_count: recipients.len(),
            distribution_count: distributions.len(),
        }
    }
}

/// Human-readable report of one distribution.
///
/// Receipts are shown largest first, named through the ledger when the
/// identity is known. Amounts carry the currency suffix.
#[must_use]
pub fn render_distribution(
    distribution: &Distribution,
    ledger: &Ledger,
    currency: &CurrencyDetails,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} distribution for epoch [{}, {}) created at {}: {} in total",
        currency.name,
        distribution.epoch.start_ms,
        distribution.epoch.end_ms,
        distribution.created_ms,
        currency.format(&distribution.total())
    );

    for allocation in &distribution.allocations {
        let _ = writeln!(
            out,
            "  {} policy: budget {}, {} recipients",
            allocation.policy.policy_type,
            currency.format(&allocation.policy.budget),
            allocation.receipts.len()
        );

        let mut receipts: Vec<&Receipt> = allocation.receipts.iter().collect();
        receipts.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)));
        for receipt in receipts.iter().take(TOP_RECEIPTS) {
            let name = ledger
                .account(receipt.id)
                .map(|a| a.identity.name.clone())
                .unwrap_or_else(|| receipt.id.to_string());
            let _ = writeln!(out, "    {:>16}  {}", currency.format(&receipt.amount), name);
        }
        if receipts.len() > TOP_RECEIPTS {
            let _ = writeln!(out, "    ... and {} more", receipts.len() - TOP_RECEIPTS);
        }
    }
    out
}
