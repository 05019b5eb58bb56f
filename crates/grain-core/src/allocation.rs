//! # Allocation
//!
//! Integer apportionment of a grain budget by the largest-remainder method.
//!
//! Weights are exact decimals. They are lifted to a common scale so every
//! share `budget × wᵢ / Σw` is computed on integers: the floors are handed
//! out first, then the leftover base units go one at a time to the largest
//! fractional remainders, ties broken by ascending identity. The result
//! sums to the budget exactly.

use crate::attribution::PersonalAttributionsMap;
use crate::distribution::{Allocation, Receipt};
use crate::policy::AllocationPolicy;
use crate::{GrainAmount, GrainError, IdentityId, TimestampMs};
use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Split `budget` proportionally to `weights`.
///
/// Repeated ids are merged. Only ids with a positive weight appear in the
/// output, in ascending id order. With no positive weight nothing is
/// distributed and the result is empty.
pub fn apportion(
    budget: &GrainAmount,
    weights: &[(IdentityId, Decimal)],
) -> Result<Vec<(IdentityId, GrainAmount)>, GrainError> {
    let mut merged: BTreeMap<IdentityId, Decimal> = BTreeMap::new();
    for &(id, weight) in weights {
        if weight < Decimal::ZERO {
            return Err(GrainError::NegativeWeight { id, weight });
        }
        let entry = merged.entry(id).or_insert(Decimal::ZERO);
        *entry = entry
            .checked_add(weight)
            .ok_or_else(|| GrainError::InvalidCredView(format!("weight overflow for {id}")))?;
    }
    let positive: Vec<(IdentityId, Decimal)> =
        merged.into_iter().filter(|(_, w)| *w > Decimal::ZERO).collect();
    if positive.is_empty() {
        return Ok(Vec::new());
    }

    let scale = positive.iter().map(|(_, w)| w.scale()).max().unwrap_or(0);
    let numerators: Vec<BigUint> = positive
        .iter()
        .map(|(_, w)| scaled_numerator(*w, scale))
        .collect();
    let total: BigUint = numerators.iter().sum();

    let budget = budget.base_units();
    let mut shares = Vec::with_capacity(numerators.len());
    let mut remainders = Vec::with_capacity(numerators.len());
    for numerator in &numerators {
        let product = budget * numerator;
        shares.push(&product / &total);
        remainders.push(product % &total);
    }

    let assigned: BigUint = shares.iter().sum();
    let mut leftover = budget - assigned;

    // Stable sort: equal remainders keep ascending id order.
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));
    for index in order {
        if leftover.is_zero() {
            break;
        }
        shares[index] += 1u32;
        leftover -= 1u32;
    }

    Ok(positive
        .into_iter()
        .zip(shares)
        .map(|((id, _), share)| (id, GrainAmount::from_base_units(share)))
        .collect())
}

/// `weight × 10^(scale − weight.scale())` as an integer.
fn scaled_numerator(weight: Decimal, scale: u32) -> BigUint {
    let mantissa = BigUint::from(weight.mantissa().unsigned_abs());
    mantissa * BigUint::from(10u32).pow(scale - weight.scale())
}

/// Apply personal attributions to raw receipts.
///
/// Each receipt of a participant with active attributions is split by
/// largest remainder between the participant (keeping `1 − Σp`) and every
/// recipient (`pⱼ`). Pieces are merged per identity; the total is
/// unchanged. Redirected grain is not redirected again.
pub fn redirect_receipts(
    raw: Vec<(IdentityId, GrainAmount)>,
    epoch_start: TimestampMs,
    attributions: &PersonalAttributionsMap,
) -> Result<BTreeMap<IdentityId, GrainAmount>, GrainError> {
    let mut merged: BTreeMap<IdentityId, GrainAmount> = BTreeMap::new();
    for (from, amount) in raw {
        let recipients = attributions.recipients_for_epoch_and_participant(epoch_start, from);
        if recipients.is_empty() {
            *merged.entry(from).or_default() += &amount;
            continue;
        }

        let mut weights = Vec::with_capacity(recipients.len() + 1);
        let mut redirected = Decimal::ZERO;
        for to in recipients {
            let proportion = attributions
                .get_proportion_value(epoch_start, from, to)?
                .unwrap_or(Decimal::ZERO);
            redirected += proportion;
            weights.push((to, proportion));
        }
        if redirected > Decimal::ONE {
            return Err(GrainError::OverAttribution {
                from,
                epoch_start,
                sum: redirected,
            });
        }
        weights.push((from, Decimal::ONE - redirected));

        for (id, piece) in apportion(&amount, &weights)? {
            *merged.entry(id).or_default() += &piece;
        }
    }
    Ok(merged)
}

/// Build one policy clause's allocation for an epoch.
pub fn compute_allocation(
    policy: &AllocationPolicy,
    weights: &[(IdentityId, Decimal)],
    epoch_start: TimestampMs,
    attributions: &PersonalAttributionsMap,
) -> Result<Allocation, GrainError> {
    let raw = apportion(&policy.budget, weights)?;
    let receipts = redirect_receipts(raw, epoch_start, attributions)?
        .into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(id, amount)| Receipt { id, amount })
        .collect();
    Ok(Allocation {
        policy: policy.clone(),
        receipts,
    })
}

// =============================================================================
// TESTS
// =============================================================================
