//! # Cred View
//!
//! Read-only view over externally computed cred. For every participant it
//! holds, per epoch, the cred earned in that epoch and the cumulative
//! all-time cred up to and including it. Both series are aligned to the
//! view's epoch list by index.

use crate::{Epoch, GrainError, IdentityId, TimestampMs, primitives};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// One participant's cred for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredPoint {
    pub epoch_start_ms: TimestampMs,
    pub cred: Decimal,
    /// Defaults to the previous cumulative value plus `cred`.
    #[serde(default)]
    pub cumulative_cred: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EpochJson {
    start_ms: TimestampMs,
    #[serde(default)]
    end_ms: Option<TimestampMs>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticipantJson {
    id: IdentityId,
    series: Vec<CredPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredViewJson {
    epochs: Vec<EpochJson>,
    participants: Vec<ParticipantJson>,
}

// =============================================================================
// CRED VIEW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParticipantCred {
    cred: Vec<Decimal>,
    cumulative: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CredView {
    epochs: Vec<Epoch>,
    participants: BTreeMap<IdentityId, ParticipantCred>,
}

impl CredView {
    /// Build and validate a view.
    ///
    /// Epochs must be non-empty intervals in strictly increasing,
    /// non-overlapping order. Every point must name a listed epoch at most
    /// once per participant, and weights must be non-negative. Epochs a
    /// participant has no point for get zero cred and carry the previous
    /// cumulative value.
    pub fn new(
        epochs: Vec<Epoch>,
        participants: Vec<(IdentityId, Vec<CredPoint>)>,
    ) -> Result<Self, GrainError> {
        let invalid = |msg: String| GrainError::InvalidCredView(msg);

        for epoch in &epochs {
            if epoch.end_ms <= epoch.start_ms {
                return Err(invalid(format!(
                    "epoch starting at {} has end {}",
                    epoch.start_ms, epoch.end_ms
                )));
            }
        }
        for pair in epochs.windows(2) {
            if pair[1].start_ms < pair[0].end_ms {
                return Err(invalid(format!(
                    "epochs out of order or overlapping at {}",
                    pair[1].start_ms
                )));
            }
        }
        let index_of: BTreeMap<TimestampMs, usize> = epochs
            .iter()
            .enumerate()
            .map(|(i, e)| (e.start_ms, i))
            .collect();

        let mut by_id = BTreeMap::new();
        for (id, series) in participants {
            if by_id.contains_key(&id) {
                return Err(invalid(format!("participant {id} listed twice")));
            }

            let mut points: Vec<Option<&CredPoint>> = vec![None; epochs.len()];
            for point in &series {
                let index = *index_of.get(&point.epoch_start_ms).ok_or_else(|| {
                    invalid(format!(
                        "participant {id} has cred for unknown epoch {}",
                        point.epoch_start_ms
                    ))
                })?;
                if points[index].replace(point).is_some() {
                    return Err(invalid(format!(
                        "participant {id} has two points for epoch {}",
                        point.epoch_start_ms
                    )));
                }
                let negative = point.cred < Decimal::ZERO
                    || point.cumulative_cred.is_some_and(|c| c < Decimal::ZERO);
                if negative {
                    return Err(invalid(format!(
                        "participant {id} has negative cred in epoch {}",
                        point.epoch_start_ms
                    )));
                }
            }

            let mut cred = Vec::with_capacity(epochs.len());
            let mut cumulative = Vec::with_capacity(epochs.len());
            let mut running = Decimal::ZERO;
            for point in points {
                let this_epoch = point.map(|p| p.cred).unwrap_or(Decimal::ZERO);
                running = match point.and_then(|p| p.cumulative_cred) {
                    Some(given) => given,
                    None => running.checked_add(this_epoch).ok_or_else(|| {
                        invalid(format!("participant {id} cumulative cred overflows"))
                    })?,
                };
                cred.push(this_epoch);
                cumulative.push(running);
            }
            by_id.insert(id, ParticipantCred { cred, cumulative });
        }

        Ok(Self {
            epochs,
            participants: by_id,
        })
    }

    /// Parse and validate the JSON form.
    ///
    /// An epoch without `end_ms` lasts one week.
    pub fn from_json(bytes: &[u8]) -> Result<Self, GrainError> {
        let raw: CredViewJson = serde_json::from_slice(bytes)
            .map_err(|e| GrainError::DeserializationError(format!("cred view: {e}")))?;
        let epochs = raw
            .epochs
            .into_iter()
            .map(|e| {
                let end_ms = match e.end_ms {
                    Some(end) => end,
                    None => e.start_ms.checked_add(primitives::WEEK_MS).ok_or_else(|| {
                        GrainError::InvalidCredView(format!("epoch {} overflows", e.start_ms))
                    })?,
                };
                Ok(Epoch::new(e.start_ms, end_ms))
            })
            .collect::<Result<Vec<_>, GrainError>>()?;
        let participants = raw
            .participants
            .into_iter()
            .map(|p| (p.id, p.series))
            .collect();
        Self::new(epochs, participants)
    }

    /// Serialize to the JSON form, with every point spelled out.
    pub fn to_json(&self) -> Result<Vec<u8>, GrainError> {
        let raw = CredViewJson {
            epochs: self
                .epochs
                .iter()
                .map(|e| EpochJson {
                    start_ms: e.start_ms,
                    end_ms: Some(e.end_ms),
                })
                .collect(),
            participants: self
                .participants
                .iter()
                .map(|(id, p)| ParticipantJson {
                    id: *id,
                    series: self
                        .epochs
                        .iter()
                        .zip(p.cred.iter().zip(&p.cumulative))
                        .map(|(epoch, (cred, cumulative))| CredPoint {
                            epoch_start_ms: epoch.start_ms,
                            cred: *cred,
                            cumulative_cred: Some(*cumulative),
                        })
                        .collect(),
                })
                .collect(),
        };
        serde_json::to_vec_pretty(&raw).map_err(|e| GrainError::SerializationError(e.to_string()))
    }

    #[must_use]
    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    #[must_use]
    pub fn epoch_starts(&self) -> Vec<TimestampMs> {
        self.epochs.iter().map(|e| e.start_ms).collect()
    }

    /// Participant ids, ascending.
    pub fn participants(&self) -> impl Iterator<Item = IdentityId> + '_ {
        self.participants.keys().copied()
    }

    /// Cred earned in the epoch at `epoch_index`, per participant.
    #[must_use]
    pub fn cred_in_epoch(&self, epoch_index: usize) -> Vec<(IdentityId, Decimal)> {
        self.column(epoch_index, |p| &p.cred)
    }

    /// All-time cred through the epoch at `epoch_index`, per participant.
    #[must_use]
    pub fn cumulative_cred_through(&self, epoch_index: usize) -> Vec<(IdentityId, Decimal)> {
        self.column(epoch_index, |p| &p.cumulative)
    }

    /// Per-epoch cred of one participant.
    #[must_use]
    pub fn cred_per_epoch(&self, id: IdentityId) -> Option<&[Decimal]> {
        self.participants.get(&id).map(|p| p.cred.as_slice())
    }

    /// All-time cred of one participant (cumulative at the last epoch).
    #[must_use]
    pub fn total_cred(&self, id: IdentityId) -> Option<Decimal> {
        self.participants
            .get(&id)
            .map(|p| p.cumulative.last().copied().unwrap_or(Decimal::ZERO))
    }

    fn column(
        &self,
        epoch_index: usize,
        series: impl Fn(&ParticipantCred) -> &Vec<Decimal>,
    ) -> Vec<(IdentityId, Decimal)> {
        self.participants
            .iter()
            .filter_map(|(id, p)| series(p).get(epoch_index).map(|w| (*id, *w)))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
