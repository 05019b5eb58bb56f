//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Backend;
use crate::config::load_distribution_policy;
use grain_core::{
    DataStorage, DiskStorage, DistributionOutcome, GrainAmount, GrainError, GrainInstance,
    Identity, Ledger, RedbStorage, TimestampMs, WritableDataStorage, ledger_checksum,
    render_distribution,
};
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Location of the redb state database inside an instance.
pub const REDB_STATE_FILE: &str = "data/state.redb";

// =============================================================================
// STATE BACKEND
// =============================================================================

/// Ledger state storage selected by `--backend`.
#[derive(Debug)]
pub enum StateStorage {
    File(DiskStorage),
    Redb(RedbStorage),
}

impl DataStorage for StateStorage {
    fn get(&self, key: &str) -> Result<Vec<u8>, GrainError> {
        match self {
            Self::File(s) => s.get(key),
            Self::Redb(s) => s.get(key),
        }
    }
}

impl WritableDataStorage for StateStorage {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), GrainError> {
        match self {
            Self::File(s) => s.set(key, value),
            Self::Redb(s) => s.set(key, value),
        }
    }
}

pub type Instance = GrainInstance<DiskStorage, StateStorage>;

/// Open the instance at `root`. Inputs are always read from disk.
pub fn open_instance(root: &Path, backend: Backend) -> Result<Instance, GrainError> {
    let state = match backend {
        Backend::File => StateStorage::File(DiskStorage::new(root)),
        Backend::Redb => {
            let path = root.join(REDB_STATE_FILE);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GrainError::IoError(format!("create {}: {}", parent.display(), e))
                })?;
            }
            StateStorage::Redb(RedbStorage::open(&path)?)
        }
    };
    Ok(GrainInstance::new(DiskStorage::new(root), state))
}

/// Wall-clock time in ms since the Unix epoch.
pub fn now_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as TimestampMs)
        .unwrap_or(0)
}

/// Timestamp for a new ledger event: now, but never before the last event.
fn event_time(ledger: &Ledger) -> TimestampMs {
    ledger
        .last_timestamp()
        .map_or_else(now_ms, |last| now_ms().max(last))
}

fn identity_by_name<'a>(ledger: &'a Ledger, name: &str) -> Result<&'a Identity, GrainError> {
    ledger
        .identity_by_name(name)
        .ok_or_else(|| GrainError::UnknownName(name.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), GrainError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| GrainError::SerializationError(format!("json output: {e}")))?;
    println!("{text}");
    Ok(())
}

// =============================================================================
// DISTRIBUTE COMMAND
// =============================================================================

/// Run every due distribution.
pub fn cmd_distribute(
    instance: &Instance,
    json_mode: bool,
    simulation: bool,
    now: TimestampMs,
) -> Result<(), GrainError> {
    let policy = load_distribution_policy(instance.inputs())?;
    let outcome = instance.distribute(&policy, now, simulation)?;

    if json_mode {
        return print_json(&serde_json::json!({
            "simulation": simulation,
            "currency": outcome.currency,
            "summary": outcome.summary,
            "distributions": outcome.distributions,
        }));
    }

    println!("{}", distribution_headline(&outcome, simulation));
    for distribution in &outcome.distributions {
        println!(
            "{}",
            render_distribution(distribution, &outcome.ledger, &outcome.currency)
        );
    }
    Ok(())
}

/// One-line total of a run, in the instance's currency.
pub fn distribution_headline(outcome: &DistributionOutcome, simulation: bool) -> String {
    format!(
        "{} {} to {} identities in {} distributions",
        if simulation { "Simulated" } else { "Distributed" },
        outcome.currency.format(&outcome.summary.total_distributed),
        outcome.summary.recipient_count,
        outcome.summary.distribution_count
    )
}

// =============================================================================
// ACCOUNTS COMMAND
// =============================================================================

/// Recompute and print the account projection.
pub fn cmd_accounts(instance: &Instance, json_mode: bool) -> Result<(), GrainError> {
    let data = instance.update_accounts()?;

    if json_mode {
        return print_json(&data);
    }

    println!("{:<24} {:>16} {:>16} {:>12}", "Name", "Balance", "Paid", "Cred");
    for account in &data.accounts {
        let name = account
            .name
            .clone()
            .unwrap_or_else(|| account.id.to_string());
        println!(
            "{:<24} {:>16} {:>16} {:>12}",
            name,
            account.balance,
            account.paid,
            account.total_cred.round_dp(2)
        );
    }
    Ok(())
}

// =============================================================================
// IDENTITY COMMANDS
// =============================================================================

#[derive(Debug, Serialize)]
struct IdentityRow<'a> {
    id: String,
    name: &'a str,
    aliases: &'a [String],
    balance: &'a GrainAmount,
    paid: &'a GrainAmount,
}

pub fn cmd_identity_add(
    instance: &Instance,
    json_mode: bool,
    name: &str,
) -> Result<(), GrainError> {
    let mut ledger = instance.load_ledger()?;
    let id = ledger.create_identity(name, event_time(&ledger))?;
    instance.save_ledger(&ledger)?;
    info!(%id, name, "Identity created");

    if json_mode {
        return print_json(&serde_json::json!({ "id": id.to_string(), "name": name }));
    }
    println!("{id}");
    Ok(())
}

pub fn cmd_identity_rename(
    instance: &Instance,
    name: &str,
    new_name: &str,
) -> Result<(), GrainError> {
    let mut ledger = instance.load_ledger()?;
    let id = identity_by_name(&ledger, name)?.id;
    ledger.rename_identity(id, new_name, event_time(&ledger))?;
    instance.save_ledger(&ledger)?;
    info!(%id, from = name, to = new_name, "Identity renamed");
    Ok(())
}

pub fn cmd_identity_alias(
    instance: &Instance,
    name: &str,
    alias: &str,
) -> Result<(), GrainError> {
    let mut ledger = instance.load_ledger()?;
    let id = identity_by_name(&ledger, name)?.id;
    ledger.add_alias(id, alias, event_time(&ledger))?;
    instance.save_ledger(&ledger)?;
    info!(%id, alias, "Alias added");
    Ok(())
}

pub fn cmd_identity_list(instance: &Instance, json_mode: bool) -> Result<(), GrainError> {
    let ledger = instance.load_ledger()?;
    let rows: Vec<IdentityRow<'_>> = ledger
        .accounts()
        .map(|a| IdentityRow {
            id: a.identity.id.to_string(),
            name: &a.identity.name,
            aliases: &a.identity.aliases,
            balance: &a.balance,
            paid: &a.paid,
        })
        .collect();

    if json_mode {
        return print_json(&rows);
    }

    for row in &rows {
        println!("{}  {:<24} {:>16}", row.id, row.name, row.balance);
        for alias in row.aliases {
            println!("    alias: {alias}");
        }
    }
    Ok(())
}

// =============================================================================
// TRANSFER COMMAND
// =============================================================================

pub fn cmd_transfer(
    instance: &Instance,
    from: &str,
    to: &str,
    amount: &str,
    memo: Option<String>,
) -> Result<(), GrainError> {
    let amount = GrainAmount::parse(amount)?;
    let mut ledger = instance.load_ledger()?;
    let sender = identity_by_name(&ledger, from)?.id;
    let receiver = identity_by_name(&ledger, to)?.id;

    ledger.transfer_grain(sender, receiver, amount.clone(), memo, event_time(&ledger))?;
    instance.save_ledger(&ledger)?;
    info!(from, to, amount = %amount, "Grain transferred");
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the BLAKE3 checksum of the ledger.
pub fn cmd_hash(instance: &Instance, json_mode: bool) -> Result<(), GrainError> {
    let ledger = instance.load_ledger()?;
    let checksum = ledger_checksum(&ledger)?;

    if json_mode {
        return print_json(&serde_json::json!({
            "algorithm": "blake3",
            "hash": checksum,
            "events": ledger.events().len(),
        }));
    }
    println!("{checksum}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grain_core::{CurrencyDetails, DistributionSummary};
    use std::collections::BTreeMap;

    #[test]
    fn json_failure_is_reported() {
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "non-string key");
        assert!(matches!(print_json(&bad), Err(GrainError::SerializationError(_))));
        assert!(print_json(&serde_json::json!({ "ok": true })).is_ok());
    }

    #[test]
    fn headline_uses_currency_suffix() {
        let outcome = DistributionOutcome {
            distributions: Vec::new(),
            summary: DistributionSummary {
                total_distributed: GrainAmount::from_whole_grain(12),
                recipient_count: 3,
                distribution_count: 2,
            },
            ledger: Ledger::new(),
            currency: CurrencyDetails {
                name: "Seeds".to_string(),
                suffix: " SEED".to_string(),
            },
        };
        assert_eq!(
            distribution_headline(&outcome, false),
            "Distributed 12.00 SEED to 3 identities in 2 distributions"
        );
        assert!(distribution_headline(&outcome, true).starts_with("Simulated 12.00 SEED"));
    }
}
