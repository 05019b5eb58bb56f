//! # Cred Accounts
//!
//! Read-only projection joining ledger balances with cred. Recomputed from
//! scratch on every run; never a source of truth.

use crate::cred::CredView;
use crate::ledger::Ledger;
use crate::{GrainAmount, GrainError, IdentityId, TimestampMs};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredAccount {
    pub id: IdentityId,
    /// `None` for participants with cred but no ledger identity.
    pub name: Option<String>,
    pub total_cred: Decimal,
    /// Aligned with `CredAccountData::epoch_ends`.
    pub cred_per_epoch: Vec<Decimal>,
    pub balance: GrainAmount,
    pub paid: GrainAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredAccountData {
    pub accounts: Vec<CredAccount>,
    pub epoch_ends: Vec<TimestampMs>,
}

/// One account per identity known to the ledger or the cred view, sorted
/// by identity id.
#[must_use]
pub fn compute_cred_accounts(ledger: &Ledger, cred_view: &CredView) -> CredAccountData {
    let ids: BTreeSet<IdentityId> = ledger
        .accounts()
        .map(|a| a.identity.id)
        .chain(cred_view.participants())
        .collect();
    let epoch_count = cred_view.epochs().len();

    let accounts = ids
        .into_iter()
        .map(|id| {
            let ledger_account = ledger.account(id);
            CredAccount {
                id,
                name: ledger_account.map(|a| a.identity.name.clone()),
                total_cred: cred_view.total_cred(id).unwrap_or(Decimal::ZERO),
                cred_per_epoch: cred_view
                    .cred_per_epoch(id)
                    .map(<[Decimal]>::to_vec)
                    .unwrap_or_else(|| vec![Decimal::ZERO; epoch_count]),
                balance: ledger_account
                    .map(|a| a.balance.clone())
                    .unwrap_or_default(),
                paid: ledger_account.map(|a| a.paid.clone()).unwrap_or_default(),
            }
        })
        .collect();

    CredAccountData {
        accounts,
        epoch_ends: cred_view.epochs().iter().map(|e| e.end_ms).collect(),
    }
}

/// Pretty JSON with a trailing newline. Equal data gives equal bytes.
pub fn accounts_to_json(data: &CredAccountData) -> Result<Vec<u8>, GrainError> {
    let mut bytes = serde_json::to_vec_pretty(data)
        .map_err(|e| GrainError::SerializationError(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Epoch;
    use crate::cred::CredPoint;
    use crate::distribution::{Allocation, Distribution, Receipt};
    use crate::identity::Identity;
    use crate::policy::{AllocationPolicy, PolicyType};

    fn setup() -> (Ledger, CredView, IdentityId, IdentityId, IdentityId) {
        let a = IdentityId::from_u128(1);
        let b = IdentityId::from_u128(2);
        let c = IdentityId::from_u128(3);

        let mut ledger = Ledger::new();
        ledger
            .add_identity(Identity::with_id(a, "alice").expect("name"), 0)
            .expect("a");
        ledger
            .add_identity(Identity::with_id(b, "bob").expect("name"), 0)
            .expect("b");
        ledger
            .distribute_grain(Distribution {
                epoch: Epoch::new(0, 10),
                created_ms: 20,
                allocations: vec![Allocation {
                    policy: AllocationPolicy {
                        policy_type: PolicyType::Immediate,
                        budget: GrainAmount::from_whole_grain(5),
                    },
                    receipts: vec![Receipt {
                        id: a,
                        amount: GrainAmount::from_whole_grain(5),
                    }],
                }],
            })
            .expect("distribute");

        let view = CredView::new(
            vec![Epoch::new(0, 10), Epoch::new(10, 20)],
            vec![
                (
                    a,
                    vec![CredPoint {
                        epoch_start_ms: 0,
                        cred: Decimal::new(15, 1),
                        cumulative_cred: None,
                    }],
                ),
                (
                    c,
                    vec![CredPoint {
                        epoch_start_ms: 10,
                        cred: Decimal::ONE,
                        cumulative_cred: None,
                    }],
                ),
            ],
        )
        .expect("view");
        (ledger, view, a, b, c)
    }

    #[test]
    fn union_of_ledger_and_cred() {
        let (ledger, view, a, b, c) = setup();
        let data = compute_cred_accounts(&ledger, &view);
        let ids: Vec<_> = data.accounts.iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert_eq!(data.epoch_ends, vec![10, 20]);

        let alice = &data.accounts[0];
        assert_eq!(alice.name.as_deref(), Some("alice"));
        assert_eq!(alice.total_cred, Decimal::new(15, 1));
        assert_eq!(alice.balance, GrainAmount::from_whole_grain(5));
        assert_eq!(alice.paid, GrainAmount::from_whole_grain(5));

        let bob = &data.accounts[1];
        assert_eq!(bob.total_cred, Decimal::ZERO);
        assert_eq!(bob.cred_per_epoch, vec![Decimal::ZERO, Decimal::ZERO]);

        let stranger = &data.accounts[2];
        assert_eq!(stranger.name, None);
        assert!(stranger.balance.is_zero());
        assert_eq!(stranger.cred_per_epoch, vec![Decimal::ZERO, Decimal::ONE]);
    }

    #[test]
    fn json_is_stable() {
        let (ledger, view, ..) = setup();
        let first = accounts_to_json(&compute_cred_accounts(&ledger, &view)).expect("json");
        let second = accounts_to_json(&compute_cred_accounts(&ledger, &view)).expect("json");
        assert_eq!(first, second);

        let text = String::from_utf8(first).expect("utf8");
        assert!(text.contains("\"total_cred\": \"1.5\""));
        assert!(text.contains("\"balance\": \"5000000000000000000\""));
    }
}
