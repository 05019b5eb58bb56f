//! # Instance
//!
//! The command surface over one instance directory.
//!
//! Inputs (cred view, personal attributions, policy file) are produced by
//! other tools and only ever read. State (ledger, account projection) is
//! read and written. The two sides may live in different backends.
//!
//! Persistence order is fixed: nothing is written until every distribution
//! has been applied in memory, and the account projection is written only
//! after the ledger write succeeded.

use crate::accounts::{CredAccountData, accounts_to_json, compute_cred_accounts};
use crate::attribution::{PersonalAttribution, PersonalAttributionsMap};
use crate::cred::CredView;
use crate::currency::CurrencyDetails;
use crate::distribution::{Distribution, apply_distributions};
use crate::formats::{ledger_from_bytes, ledger_to_bytes};
use crate::ledger::Ledger;
use crate::policy::DistributionPolicy;
use crate::storage::{DataStorage, WritableDataStorage, load_or_default};
use crate::summary::DistributionSummary;
use crate::{GrainError, TimestampMs, primitives};
use tracing::{debug, info};

/// Result of one distribution run.
#[derive(Debug, Clone)]
pub struct DistributionOutcome {
    pub distributions: Vec<Distribution>,
    pub summary: DistributionSummary,
    /// The ledger after the run (persisted unless simulated).
    pub ledger: Ledger,
    pub currency: CurrencyDetails,
}

#[derive(Debug)]
pub struct GrainInstance<I, S> {
    inputs: I,
    state: S,
}

impl<I: DataStorage, S: WritableDataStorage> GrainInstance<I, S> {
    pub fn new(inputs: I, state: S) -> Self {
        Self { inputs, state }
    }

    pub fn inputs(&self) -> &I {
        &self.inputs
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Load the ledger; an instance without one starts empty.
    pub fn load_ledger(&self) -> Result<Ledger, GrainError> {
        match self.state.get(primitives::LEDGER_KEY) {
            Ok(bytes) => ledger_from_bytes(&bytes),
            Err(GrainError::NotFound(_)) => {
                debug!("No ledger found, starting empty");
                Ok(Ledger::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn save_ledger(&self, ledger: &Ledger) -> Result<(), GrainError> {
        self.state
            .set(primitives::LEDGER_KEY, &ledger_to_bytes(ledger)?)
    }

    pub fn load_cred_view(&self) -> Result<CredView, GrainError> {
        CredView::from_json(&self.inputs.get(primitives::CRED_VIEW_KEY)?)
    }

    /// Currency naming for reports; defaults when the file is absent.
    pub fn load_currency_details(&self) -> Result<CurrencyDetails, GrainError> {
        let bytes = load_or_default(
            &self.inputs,
            primitives::CURRENCY_DETAILS_KEY,
            b"{}".to_vec(),
        )?;
        CurrencyDetails::from_json(&bytes)
    }

    /// Load and validate personal attributions against `epoch_starts`.
    ///
    /// A missing file means no attributions.
    pub fn load_personal_attributions(
        &self,
        epoch_starts: &[TimestampMs],
    ) -> Result<PersonalAttributionsMap, GrainError> {
        let bytes = load_or_default(
            &self.inputs,
            primitives::PERSONAL_ATTRIBUTIONS_KEY,
            b"[]".to_vec(),
        )?;
        let attributions: Vec<PersonalAttribution> = serde_json::from_slice(&bytes)
            .map_err(|e| GrainError::DeserializationError(format!("personal attributions: {e}")))?;
        PersonalAttributionsMap::new(attributions, epoch_starts)
    }

    /// Run every due distribution.
    ///
    /// Unless `simulation` is set, the ledger and then the account
    /// projection are persisted. A simulation writes nothing.
    pub fn distribute(
        &self,
        policy: &DistributionPolicy,
        now: TimestampMs,
        simulation: bool,
    ) -> Result<DistributionOutcome, GrainError> {
        let mut ledger = self.load_ledger()?;
        let cred_view = self.load_cred_view()?;
        let attributions = self.load_personal_attributions(&cred_view.epoch_starts())?;
        let currency = self.load_currency_details()?;

        let distributions =
            apply_distributions(policy, &cred_view, &mut ledger, &attributions, now)?;
        let summary = DistributionSummary::from_distributions(&distributions);

        if simulation {
            info!(
                distributions = summary.distribution_count,
                total = %summary.total_distributed,
                "Simulation only, nothing persisted"
            );
        } else {
            self.save_ledger(&ledger)?;
            self.write_accounts(&ledger, &cred_view)?;
            info!(
                distributions = summary.distribution_count,
                recipients = summary.recipient_count,
                total = %summary.total_distributed,
                "Distributions persisted"
            );
        }

        Ok(DistributionOutcome {
            distributions,
            summary,
            ledger,
            currency,
        })
    }

    /// Recompute and persist the account projection only.
    pub fn update_accounts(&self) -> Result<CredAccountData, GrainError> {
        let ledger = self.load_ledger()?;
        let cred_view = self.load_cred_view()?;
        self.write_accounts(&ledger, &cred_view)
    }

    fn write_accounts(
        &self,
        ledger: &Ledger,
        cred_view: &CredView,
    ) -> Result<CredAccountData, GrainError> {
        let data = compute_cred_accounts(ledger, cred_view);
        self.state
            .set(primitives::ACCOUNTS_KEY, &accounts_to_json(&data)?)?;
        debug!(accounts = data.accounts.len(), "Account projection written");
        Ok(data)
    }
}
