//! # Ledger
//!
//! The append-only event log and balance authority.
//!
//! The ledger is an arena of immutable `LedgerEvent`s. Everything else
//! (accounts, balances, which epochs were distributed) is a fold over that
//! arena: `LedgerState::apply` is the single step of the fold and the only
//! code path that changes derived state. `append` runs the step before
//! pushing the event, so a rejected event leaves the ledger untouched, and
//! `from_events` replays a persisted log through the same step.

use crate::distribution::Distribution;
use crate::identity::{Identity, username_from_str};
use crate::{GrainAmount, GrainError, IdentityId, TimestampMs, primitives};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// EVENTS
// =============================================================================

/// A state transition recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    CreateIdentity {
        identity: Identity,
    },
    RenameIdentity {
        id: IdentityId,
        name: String,
    },
    AddAlias {
        id: IdentityId,
        alias: String,
    },
    DistributeGrain {
        distribution: Distribution,
    },
    TransferGrain {
        from: IdentityId,
        to: IdentityId,
        amount: GrainAmount,
        memo: Option<String>,
    },
}

/// One timestamped entry of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub timestamp_ms: TimestampMs,
    pub action: LedgerAction,
}

/// Derived per-identity view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub identity: Identity,
    /// Current spendable grain.
    pub balance: GrainAmount,
    /// All grain ever received from distributions.
    pub paid: GrainAmount,
}

// =============================================================================
// DERIVED STATE
// =============================================================================

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: BTreeMap<IdentityId, Account>,
    names: BTreeMap<String, IdentityId>,
    aliases: BTreeMap<String, IdentityId>,
    /// Epoch start -> index of the distributing event.
    distributions: BTreeMap<TimestampMs, usize>,
    last_timestamp: Option<TimestampMs>,
}

impl LedgerState {
    /// Fold one event into the state.
    ///
    /// All checks run before the first mutation.
    fn apply(&mut self, index: usize, event: &LedgerEvent) -> Result<(), GrainError> {
        if let Some(last) = self.last_timestamp
            && event.timestamp_ms < last
        {
            return Err(GrainError::TimestampRegression {
                timestamp: event.timestamp_ms,
                last,
            });
        }

        match &event.action {
            LedgerAction::CreateIdentity { identity } => {
                if self.accounts.contains_key(&identity.id) {
                    return Err(GrainError::DuplicateIdentity(identity.id));
                }
                let name = username_from_str(&identity.name)?;
                if name != identity.name {
                    return Err(GrainError::InvalidName(identity.name.clone()));
                }
                if self.names.contains_key(&name) {
                    return Err(GrainError::NameTaken(name));
                }
                for (i, alias) in identity.aliases.iter().enumerate() {
                    self.check_alias(alias)?;
                    if identity.aliases[..i].contains(alias) {
                        return Err(GrainError::AliasTaken(alias.clone()));
                    }
                }

                self.names.insert(name, identity.id);
                for alias in &identity.aliases {
                    self.aliases.insert(alias.clone(), identity.id);
                }
                self.accounts.insert(
                    identity.id,
                    Account {
                        identity: identity.clone(),
                        balance: GrainAmount::zero(),
                        paid: GrainAmount::zero(),
                    },
                );
            }
            LedgerAction::RenameIdentity { id, name } => {
                let validated = username_from_str(name)?;
                if validated != *name {
                    return Err(GrainError::InvalidName(name.clone()));
                }
                let account = self
                    .accounts
                    .get(id)
                    .ok_or(GrainError::UnknownIdentity(*id))?;
                if self.names.get(name).is_some_and(|owner| owner != id) {
                    return Err(GrainError::NameTaken(name.clone()));
                }
                let old = account.identity.name.clone();

                self.names.remove(&old);
                self.names.insert(name.clone(), *id);
                if let Some(account) = self.accounts.get_mut(id) {
                    account.identity.name = name.clone();
                }
            }
            LedgerAction::AddAlias { id, alias } => {
                if !self.accounts.contains_key(id) {
                    return Err(GrainError::UnknownIdentity(*id));
                }
                self.check_alias(alias)?;

                self.aliases.insert(alias.clone(), *id);
                if let Some(account) = self.accounts.get_mut(id) {
                    account.identity.aliases.push(alias.clone());
                }
            }
            LedgerAction::DistributeGrain { distribution } => {
                let epoch_start = distribution.epoch.start_ms;
                if self.distributions.contains_key(&epoch_start) {
                    return Err(GrainError::DuplicateDistribution { epoch_start });
                }
                for receipt in distribution.receipts() {
                    if !self.accounts.contains_key(&receipt.id) {
                        return Err(GrainError::UnknownIdentity(receipt.id));
                    }
                }

                for receipt in distribution.receipts() {
                    if let Some(account) = self.accounts.get_mut(&receipt.id) {
                        account.balance += &receipt.amount;
                        account.paid += &receipt.amount;
                    }
                }
                self.distributions.insert(epoch_start, index);
            }
            LedgerAction::TransferGrain {
                from,
                to,
                amount,
                memo,
            } => {
                if let Some(memo) = memo
                    && memo.len() > primitives::MAX_MEMO_LENGTH
                {
                    return Err(GrainError::MemoTooLong {
                        len: memo.len(),
                        max: primitives::MAX_MEMO_LENGTH,
                    });
                }
                if !self.accounts.contains_key(to) {
                    return Err(GrainError::UnknownIdentity(*to));
                }
                let sender = self
                    .accounts
                    .get(from)
                    .ok_or(GrainError::UnknownIdentity(*from))?;
                let remaining =
                    sender
                        .balance
                        .try_sub(amount)
                        .map_err(|_| GrainError::InsufficientBalance {
                            id: *from,
                            balance: sender.balance.to_string(),
                            requested: amount.to_string(),
                        })?;

                if let Some(sender) = self.accounts.get_mut(from) {
                    sender.balance = remaining;
                }
                if let Some(receiver) = self.accounts.get_mut(to) {
                    receiver.balance += amount;
                }
            }
        }

        self.last_timestamp = Some(event.timestamp_ms);
        Ok(())
    }

    fn check_alias(&self, alias: &str) -> Result<(), GrainError> {
        if alias.is_empty()
            || alias.len() > primitives::MAX_NAME_LENGTH
            || self.aliases.contains_key(alias)
        {
            return Err(GrainError::AliasTaken(alias.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Append-only grain ledger.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    events: Vec<LedgerEvent>,
    state: LedgerState,
}

impl PartialEq for Ledger {
    fn eq(&self, other: &Self) -> bool {
        self.events == other.events
    }
}

impl Eq for Ledger {}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger by replaying `events`, validating each one.
    pub fn from_events(events: Vec<LedgerEvent>) -> Result<Self, GrainError> {
        let mut ledger = Self::new();
        for event in events {
            ledger.append(event)?;
        }
        Ok(ledger)
    }

    /// Validate `event` against the current state and record it.
    pub fn append(&mut self, event: LedgerEvent) -> Result<(), GrainError> {
        self.state.apply(self.events.len(), &event)?;
        self.events.push(event);
        Ok(())
    }

    fn record(
        &mut self,
        timestamp_ms: TimestampMs,
        action: LedgerAction,
    ) -> Result<(), GrainError> {
        self.append(LedgerEvent {
            timestamp_ms,
            action,
        })
    }

    // -------------------------------------------------------------------------
    // Identity operations
    // -------------------------------------------------------------------------

    /// Create a new identity with a random id.
    pub fn create_identity(
        &mut self,
        name: &str,
        timestamp_ms: TimestampMs,
    ) -> Result<IdentityId, GrainError> {
        let identity = Identity::create(name)?;
        let id = identity.id;
        self.add_identity(identity, timestamp_ms)?;
        Ok(id)
    }

    /// Record an identity minted elsewhere.
    pub fn add_identity(
        &mut self,
        identity: Identity,
        timestamp_ms: TimestampMs,
    ) -> Result<(), GrainError> {
        self.record(timestamp_ms, LedgerAction::CreateIdentity { identity })
    }

    pub fn rename_identity(
        &mut self,
        id: IdentityId,
        name: &str,
        timestamp_ms: TimestampMs,
    ) -> Result<(), GrainError> {
        let name = username_from_str(name)?;
        self.record(timestamp_ms, LedgerAction::RenameIdentity { id, name })
    }

    pub fn add_alias(
        &mut self,
        id: IdentityId,
        alias: &str,
        timestamp_ms: TimestampMs,
    ) -> Result<(), GrainError> {
        self.record(
            timestamp_ms,
            LedgerAction::AddAlias {
                id,
                alias: alias.to_string(),
            },
        )
    }

    // -------------------------------------------------------------------------
    // Grain operations
    // -------------------------------------------------------------------------

    /// Apply a distribution, timestamped with its creation time.
    pub fn distribute_grain(&mut self, distribution: Distribution) -> Result<(), GrainError> {
        let timestamp_ms = distribution.created_ms;
        self.record(timestamp_ms, LedgerAction::DistributeGrain { distribution })
    }

    pub fn transfer_grain(
        &mut self,
        from: IdentityId,
        to: IdentityId,
        amount: GrainAmount,
        memo: Option<String>,
        timestamp_ms: TimestampMs,
    ) -> Result<(), GrainError> {
        self.record(
            timestamp_ms,
            LedgerAction::TransferGrain {
                from,
                to,
                amount,
                memo,
            },
        )
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<LedgerEvent> {
        self.events
    }

    #[must_use]
    pub fn account(&self, id: IdentityId) -> Option<&Account> {
        self.state.accounts.get(&id)
    }

    /// All accounts, ordered by identity id.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.state.accounts.values()
    }

    #[must_use]
    pub fn balance(&self, id: IdentityId) -> Option<&GrainAmount> {
        self.account(id).map(|a| &a.balance)
    }

    #[must_use]
    pub fn identity_by_name(&self, name: &str) -> Option<&Identity> {
        let name = name.strip_prefix('@').unwrap_or(name);
        self.state
            .names
            .get(name)
            .and_then(|id| self.account(*id))
            .map(|a| &a.identity)
    }

    #[must_use]
    pub fn identity_by_alias(&self, alias: &str) -> Option<&Identity> {
        self.state
            .aliases
            .get(alias)
            .and_then(|id| self.account(*id))
            .map(|a| &a.identity)
    }

    #[must_use]
    pub fn is_epoch_distributed(&self, epoch_start: TimestampMs) -> bool {
        self.state.distributions.contains_key(&epoch_start)
    }

    /// Starts of all distributed epochs, ascending.
    pub fn distributed_epochs(&self) -> impl Iterator<Item = TimestampMs> + '_ {
        self.state.distributions.keys().copied()
    }

    /// All distributions, ordered by epoch.
    pub fn distributions(&self) -> impl Iterator<Item = &Distribution> {
        self.state
            .distributions
            .values()
            .filter_map(|&index| match &self.events[index].action {
                LedgerAction::DistributeGrain { distribution } => Some(distribution),
                _ => None,
            })
    }

    #[must_use]
    pub fn last_timestamp(&self) -> Option<TimestampMs> {
        self.state.last_timestamp
    }

    /// Timestamp of the most recently appended distribution.
    #[must_use]
    pub fn last_distribution_timestamp(&self) -> Option<TimestampMs> {
        self.state
            .distributions
            .values()
            .max()
            .and_then(|&index| self.events.get(index))
            .map(|event| event.timestamp_ms)
    }

    /// Sum of every account balance.
    #[must_use]
    pub fn total_balance(&self) -> GrainAmount {
        self.accounts().map(|a| &a.balance).sum()
    }
}

// =============================================================================
// TESTS
// =============================================================================
