//! # Distributions
//!
//! A `Distribution` is one atomic issuance of grain for one completed
//! epoch: one `Allocation` per enabled policy clause, each a list of
//! `Receipt`s.
//!
//! `apply_distributions` is the periodic engine. It finds the completed
//! epochs the ledger has not distributed yet, computes their
//! distributions oldest first, and appends each to the ledger before
//! computing the next.

use crate::allocation::compute_allocation;
use crate::attribution::PersonalAttributionsMap;
use crate::cred::CredView;
use crate::ledger::Ledger;
use crate::policy::{AllocationPolicy, DistributionPolicy, PolicyType};
use crate::{Epoch, GrainAmount, GrainError, IdentityId, TimestampMs};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// =============================================================================
// TYPES
// =============================================================================

/// One recipient's share within an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: IdentityId,
    pub amount: GrainAmount,
}

/// One policy clause's payout within a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub policy: AllocationPolicy,
    /// Sorted by identity id.
    pub receipts: Vec<Receipt>,
}

impl Allocation {
    #[must_use]
    pub fn total(&self) -> GrainAmount {
        self.receipts.iter().map(|r| &r.amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub epoch: Epoch,
    pub created_ms: TimestampMs,
    pub allocations: Vec<Allocation>,
}

impl Distribution {
    /// Every receipt of every allocation.
    pub fn receipts(&self) -> impl Iterator<Item = &Receipt> {
        self.allocations.iter().flat_map(|a| a.receipts.iter())
    }

    #[must_use]
    pub fn total(&self) -> GrainAmount {
        self.receipts().map(|r| &r.amount).sum()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Completed epochs of `cred_view` that `ledger` has not distributed,
/// oldest first, capped by the policy. Returns epoch indices.
pub fn epochs_to_distribute(
    policy: &DistributionPolicy,
    cred_view: &CredView,
    ledger: &Ledger,
    now: TimestampMs,
) -> Vec<usize> {
    let pending = cred_view
        .epochs()
        .iter()
        .enumerate()
        .filter(|(_, epoch)| {
            epoch.is_completed(now) && !ledger.is_epoch_distributed(epoch.start_ms)
        })
        .map(|(index, _)| index);
    match policy.max_simultaneous_distributions {
        Some(max) => pending.take(max).collect(),
        None => pending.collect(),
    }
}

/// Compute the distribution for the epoch at `epoch_index`, stamped
/// `created_ms`.
pub fn compute_distribution(
    policy: &DistributionPolicy,
    cred_view: &CredView,
    epoch_index: usize,
    attributions: &PersonalAttributionsMap,
    created_ms: TimestampMs,
) -> Result<Distribution, GrainError> {
    let epoch = *cred_view.epochs().get(epoch_index).ok_or_else(|| {
        GrainError::InvalidCredView(format!("no epoch at index {epoch_index}"))
    })?;

    let allocations = policy
        .allocation_policies
        .iter()
        .map(|clause| {
            let weights = match clause.policy_type {
                PolicyType::Immediate => cred_view.cred_in_epoch(epoch_index),
                PolicyType::Balanced => cred_view.cumulative_cred_through(epoch_index),
            };
            let allocation = compute_allocation(clause, &weights, epoch.start_ms, attributions)?;
            debug!(
                epoch = epoch.start_ms,
                policy = %clause.policy_type,
                budget = %clause.budget,
                recipients = allocation.receipts.len(),
                "Allocation computed"
            );
            Ok(allocation)
        })
        .collect::<Result<Vec<_>, GrainError>>()?;

    Ok(Distribution {
        epoch,
        created_ms,
        allocations,
    })
}

/// Compute and apply every due distribution.
///
/// Works on a copy of `ledger`; the caller's ledger is replaced only when
/// every distribution has been applied, so a failure leaves it untouched.
/// `now` selects the completed epochs. New distributions are stamped with
/// `now`, or the ledger's last timestamp when that is later.
pub fn apply_distributions(
    policy: &DistributionPolicy,
    cred_view: &CredView,
    ledger: &mut Ledger,
    attributions: &PersonalAttributionsMap,
    now: TimestampMs,
) -> Result<Vec<Distribution>, GrainError> {
    let mut working = ledger.clone();
    let mut distributions = Vec::new();
    let created_ms = ledger.last_timestamp().map_or(now, |last| now.max(last));

    for epoch_index in epochs_to_distribute(policy, cred_view, &working, now) {
        let distribution =
            compute_distribution(policy, cred_view, epoch_index, attributions, created_ms)?;
        working.distribute_grain(distribution.clone())?;
        distributions.push(distribution);
    }

    info!(
        count = distributions.len(),
        "Distributions applied to in-memory ledger"
    );
    *ledger = working;
    Ok(distributions)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::{PersonalAttribution, PersonalAttributionProportion};
    use crate::cred::CredPoint;
    use crate::identity::Identity;
    use crate::policy::GrainConfig;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal")
    }

    fn policy(immediate: i64, balanced: i64, max: Option<i64>) -> DistributionPolicy {
        GrainConfig {
            immediate_per_week: immediate,
            balanced_per_week: balanced,
            max_simultaneous_distributions: max,
        }
        .to_distribution_policy()
        .expect("policy")
    }

    struct Fixture {
        ledger: Ledger,
        a: IdentityId,
        b: IdentityId,
    }

    fn fixture() -> Fixture {
        let a = IdentityId::from_u128(1);
        let b = IdentityId::from_u128(2);
        let mut ledger = Ledger::new();
        ledger
            .add_identity(Identity::with_id(a, "a").expect("name"), 0)
            .expect("a");
        ledger
            .add_identity(Identity::with_id(b, "b").expect("name"), 0)
            .expect("b");
        Fixture { ledger, a, b }
    }

    fn point(start: TimestampMs, cred: &str) -> CredPoint {
        CredPoint {
            epoch_start_ms: start,
            cred: dec(cred),
            cumulative_cred: None,
        }
    }

    fn three_epochs(a: IdentityId, b: IdentityId) -> CredView {
        CredView::new(
            vec![Epoch::new(0, 100), Epoch::new(100, 200), Epoch::new(200, 300)],
            vec![
                (a, vec![point(0, "1"), point(100, "1"), point(200, "3")]),
                (b, vec![point(0, "1"), point(100, "3"), point(200, "1")]),
            ],
        )
        .expect("view")
    }

    #[test]
    fn equal_cred_splits_evenly() {
        let Fixture { mut ledger, a, b } = fixture();
        let view = CredView::new(
            vec![Epoch::new(0, 100)],
            vec![(a, vec![point(0, "0.5")]), (b, vec![point(0, "0.5")])],
        )
        .expect("view");

        let out = apply_distributions(
            &policy(100, 0, None),
            &view,
            &mut ledger,
            &PersonalAttributionsMap::empty(),
            1_000,
        )
        .expect("apply");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].allocations.len(), 1);
        let receipts = &out[0].allocations[0].receipts;
        assert_eq!(receipts.len(), 2);
        assert!(
            receipts
                .iter()
                .all(|r| r.amount == GrainAmount::from_whole_grain(50))
        );
        assert_eq!(out[0].total(), GrainAmount::from_whole_grain(100));
        assert_eq!(ledger.balance(a), Some(&GrainAmount::from_whole_grain(50)));
    }

    #[test]
    fn only_completed_undistributed_epochs() {
        let Fixture { mut ledger, a, b } = fixture();
        let view = three_epochs(a, b);
        let p = policy(10, 0, None);
        let attributions = PersonalAttributionsMap::empty();

        let first = apply_distributions(&p, &view, &mut ledger, &attributions, 250)
            .expect("apply");
        let starts: Vec<_> = first.iter().map(|d| d.epoch.start_ms).collect();
        assert_eq!(starts, vec![0, 100]);

        let second = apply_distributions(&p, &view, &mut ledger, &attributions, 301)
            .expect("apply");
        let starts: Vec<_> = second.iter().map(|d| d.epoch.start_ms).collect();
        assert_eq!(starts, vec![200]);

        let third = apply_distributions(&p, &view, &mut ledger, &attributions, 10_000)
            .expect("apply");
        assert!(third.is_empty());
        assert_eq!(ledger.total_balance(), GrainAmount::from_whole_grain(30));
    }

    #[test]
    fn cap_keeps_oldest() {
        let Fixture { mut ledger, a, b } = fixture();
        let view = three_epochs(a, b);
        let out = apply_distributions(
            &policy(10, 0, Some(2)),
            &view,
            &mut ledger,
            &PersonalAttributionsMap::empty(),
            1_000,
        )
        .expect("apply");
        let starts: Vec<_> = out.iter().map(|d| d.epoch.start_ms).collect();
        assert_eq!(starts, vec![0, 100]);
    }

    #[test]
    fn balanced_uses_cumulative_cred() {
        let Fixture { mut ledger, a, b } = fixture();
        let view = three_epochs(a, b);
        let out = apply_distributions(
            &policy(0, 10, None),
            &view,
            &mut ledger,
            &PersonalAttributionsMap::empty(),
            1_000,
        )
        .expect("apply");
        // Cumulative after epoch 2: a = 5, b = 5.
        let last = &out[2].allocations[0];
        assert_eq!(last.policy.policy_type, PolicyType::Balanced);
        assert_eq!(last.receipts[0].amount, GrainAmount::from_whole_grain(5));
        assert_eq!(last.receipts[1].amount, GrainAmount::from_whole_grain(5));
        // Epoch 1: a = 2, b = 4.
        let middle = &out[1].allocations[0];
        assert_eq!(
            middle.receipts[0].amount,
            GrainAmount::parse("3.333333333333333333").expect("amount")
        );
        assert_eq!(middle.total(), GrainAmount::from_whole_grain(10));
    }

    #[test]
    fn attribution_redirects_share() {
        let Fixture { mut ledger, a, b } = fixture();
        let view = CredView::new(
            vec![Epoch::new(100, 200)],
            vec![(a, vec![point(100, "1")])],
        )
        .expect("view");
        let attributions = PersonalAttributionsMap::new(
            vec![PersonalAttribution {
                from_participant_id: a,
                to_participant_id: b,
                proportions: vec![PersonalAttributionProportion {
                    timestamp_ms: 0,
                    proportion_value: dec("0.4"),
                }],
            }],
            &view.epoch_starts(),
        )
        .expect("attributions");

        apply_distributions(&policy(100, 0, None), &view, &mut ledger, &attributions, 1_000)
            .expect("apply");
        assert_eq!(ledger.balance(a), Some(&GrainAmount::from_whole_grain(60)));
        assert_eq!(ledger.balance(b), Some(&GrainAmount::from_whole_grain(40)));
    }

    #[test]
    fn failure_leaves_ledger_untouched() {
        let Fixture { mut ledger, a, .. } = fixture();
        let stranger = IdentityId::from_u128(77);
        let view = CredView::new(
            vec![Epoch::new(0, 100), Epoch::new(100, 200)],
            vec![
                (a, vec![point(0, "1"), point(100, "1")]),
                (stranger, vec![point(100, "1")]),
            ],
        )
        .expect("view");
        let before = ledger.clone();

        let result = apply_distributions(
            &policy(10, 0, None),
            &view,
            &mut ledger,
            &PersonalAttributionsMap::empty(),
            1_000,
        );
        assert!(matches!(result, Err(GrainError::UnknownIdentity(id)) if id == stranger));
        assert_eq!(ledger, before);
    }

    #[test]
    fn stamp_never_precedes_last_event() {
        let Fixture { mut ledger, a, .. } = fixture();
        let late = Identity::with_id(IdentityId::from_u128(3), "late").expect("name");
        ledger.add_identity(late, 10_000).expect("late");
        let view = CredView::new(vec![Epoch::new(0, 100)], vec![(a, vec![point(0, "1")])])
            .expect("view");

        let out = apply_distributions(
            &policy(10, 0, None),
            &view,
            &mut ledger,
            &PersonalAttributionsMap::empty(),
            5_000,
        )
        .expect("apply");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].created_ms, 10_000);
        assert_eq!(ledger.last_distribution_timestamp(), Some(10_000));
        assert_eq!(ledger.balance(a), Some(&GrainAmount::from_whole_grain(10)));
    }

    #[test]
    fn no_cred_still_marks_epoch() {
        let Fixture { mut ledger, .. } = fixture();
        let view = CredView::new(vec![Epoch::new(0, 100)], vec![]).expect("view");
        let out = apply_distributions(
            &policy(10, 0, None),
            &view,
            &mut ledger,
            &PersonalAttributionsMap::empty(),
            1_000,
        )
        .expect("apply");
        assert_eq!(out.len(), 1);
        assert!(out[0].allocations[0].receipts.is_empty());
        assert!(ledger.is_epoch_distributed(0));
    }
}
