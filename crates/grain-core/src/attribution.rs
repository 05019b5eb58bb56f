//! # Personal Attributions
//!
//! A personal attribution redirects a fraction of one participant's future
//! distributions to another participant. Each attribution carries a
//! time-ordered list of proportions; the proportion in effect for an epoch
//! is the last one set strictly before the epoch began.
//!
//! `PersonalAttributionsMap` validates a whole set of attributions once and
//! is immutable afterwards.

use crate::{GrainError, IdentityId, TimestampMs};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// From `timestamp_ms` onward, `proportion_value` of the source
/// participant's distributions is redirected (until superseded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalAttributionProportion {
    pub timestamp_ms: TimestampMs,
    pub proportion_value: Decimal,
}

/// All proportions configured from one participant to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalAttribution {
    pub from_participant_id: IdentityId,
    pub to_participant_id: IdentityId,
    pub proportions: Vec<PersonalAttributionProportion>,
}

/// Validated index of personal attributions, grouped by source participant.
#[derive(Debug, Clone, Default)]
pub struct PersonalAttributionsMap {
    by_from: BTreeMap<IdentityId, Vec<PersonalAttribution>>,
}

impl PersonalAttributionsMap {
    /// Validate `attributions` against every epoch in `epoch_starts`.
    ///
    /// Fails when a (from, to) pair repeats, when proportions are out of
    /// chronological order, when a proportion lies outside [0, 1], or when
    /// a participant redirects more than 100% in any listed epoch.
    pub fn new(
        attributions: Vec<PersonalAttribution>,
        epoch_starts: &[TimestampMs],
    ) -> Result<Self, GrainError> {
        let mut pairs = BTreeSet::new();
        for pa in &attributions {
            let from = pa.from_participant_id;
            let to = pa.to_participant_id;
            if !pairs.insert((from, to)) {
                return Err(GrainError::DuplicateAttribution { from, to });
            }
            for window in pa.proportions.windows(2) {
                if window[1].timestamp_ms < window[0].timestamp_ms {
                    return Err(GrainError::AttributionOutOfOrder { from, to });
                }
            }
            if let Some(bad) = pa
                .proportions
                .iter()
                .find(|p| p.proportion_value < Decimal::ZERO || p.proportion_value > Decimal::ONE)
            {
                return Err(GrainError::ProportionOutOfRange {
                    from,
                    to,
                    value: bad.proportion_value,
                });
            }
        }

        let mut by_from: BTreeMap<IdentityId, Vec<PersonalAttribution>> = BTreeMap::new();
        for pa in attributions {
            by_from.entry(pa.from_participant_id).or_default().push(pa);
        }

        for (from, group) in &by_from {
            for &epoch_start in epoch_starts {
                let sum = sum_proportion_values(epoch_start, group);
                if sum > Decimal::ONE {
                    return Err(GrainError::OverAttribution {
                        from: *from,
                        epoch_start,
                        sum,
                    });
                }
            }
        }

        Ok(Self { by_from })
    }

    /// A map with no attributions.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_from.is_empty()
    }

    /// Every attribution held by the map.
    #[must_use]
    pub fn to_personal_attributions(&self) -> Vec<PersonalAttribution> {
        self.by_from.values().flatten().cloned().collect()
    }

    /// Recipients with an active, non-zero proportion from `from` in the
    /// epoch starting at `epoch_start`.
    #[must_use]
    pub fn recipients_for_epoch_and_participant(
        &self,
        epoch_start: TimestampMs,
        from: IdentityId,
    ) -> Vec<IdentityId> {
        let Some(group) = self.by_from.get(&from) else {
            return Vec::new();
        };
        group
            .iter()
            .filter(|pa| {
                proportion_value_at(epoch_start, &pa.proportions).is_some_and(|v| !v.is_zero())
            })
            .map(|pa| pa.to_participant_id)
            .collect()
    }

    /// Effective proportion from `from` to `to`.
    ///
    /// Errors when the pair has no attribution; `Ok(None)` when the pair
    /// exists but is not active yet.
    pub fn get_proportion_value(
        &self,
        epoch_start: TimestampMs,
        from: IdentityId,
        to: IdentityId,
    ) -> Result<Option<Decimal>, GrainError> {
        let attribution = self
            .by_from
            .get(&from)
            .and_then(|group| group.iter().find(|pa| pa.to_participant_id == to))
            .ok_or(GrainError::AttributionNotFound { from, to })?;
        Ok(proportion_value_at(epoch_start, &attribution.proportions))
    }

    /// Total effective proportion redirected by `from`.
    ///
    /// `None` means `from` has no attributions at all, which is different
    /// from `Some(0)`: attributions exist but none is active.
    #[must_use]
    pub fn get_sum_proportion_value(
        &self,
        epoch_start: TimestampMs,
        from: IdentityId,
    ) -> Option<Decimal> {
        self.by_from
            .get(&from)
            .map(|group| sum_proportion_values(epoch_start, group))
    }
}

/// The proportion in effect for an epoch starting at `epoch_start`.
pub fn proportion_value_at(
    epoch_start: TimestampMs,
    proportions: &[PersonalAttributionProportion],
) -> Option<Decimal> {
    if proportions
        .first()
        .is_some_and(|first| epoch_start < first.timestamp_ms)
    {
        return None;
    }
    proportions
        .iter()
        .rev()
        .find(|p| p.timestamp_ms < epoch_start)
        .map(|p| p.proportion_value)
}

fn sum_proportion_values(epoch_start: TimestampMs, group: &[PersonalAttribution]) -> Decimal {
    group
        .iter()
        .filter_map(|pa| proportion_value_at(epoch_start, &pa.proportions))
        .sum()
}

// =============================================================================
// TESTS
// =============================================================================
