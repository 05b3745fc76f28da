//! Live balance versus replayed history

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use core_kernel::checked_sum;

use crate::account::Domain;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ports::LedgerStore;

const SNAPSHOT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub domain: Domain,
    pub live_balance: Decimal,
    pub recomputed_balance: Decimal,
    /// `live - recomputed`
    pub drift: Decimal,
    pub is_consistent: bool,
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    pub async fn reconcile(&self, domain: Domain) -> Result<ReconciliationReport, LedgerError> {
        let base = self.config.opening_balance(domain);
        let mut attempt = 0;
        let (live_balance, history) = loop {
            attempt += 1;
            let before = self.live_balance(domain, base).await?;
            let history = self.store.history(domain, None).await?.scoped(domain);
            let after = self.live_balance(domain, base).await?;
            // a posting landed between the reads; take a fresh pair
            if before == after || attempt == SNAPSHOT_ATTEMPTS {
                break (after, history);
            }
        };
        let recomputed_balance = checked_sum(base, history.net()?)?;
        let drift = live_balance
            .checked_sub(recomputed_balance)
            .ok_or_else(|| LedgerError::Overflow(format!("drift of {}", domain)))?;

        let report = ReconciliationReport {
            domain,
            live_balance,
            recomputed_balance,
            drift,
            is_consistent: drift.is_zero(),
        };
        if report.is_consistent {
            debug!(%domain, balance = %live_balance, "ledger consistent");
        } else {
            warn!(%domain, live = %live_balance, recomputed = %recomputed_balance, %drift, "ledger drift detected");
        }
        Ok(report)
    }

    async fn live_balance(&self, domain: Domain, base: Decimal) -> Result<Decimal, LedgerError> {
        Ok(self
            .store
            .account(domain)
            .await?
            .map(|account| account.balance())
            .unwrap_or(base))
    }

    /// Every domain, Main first
    pub async fn reconcile_all(&self) -> Result<Vec<ReconciliationReport>, LedgerError> {
        let mut reports = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            reports.push(self.reconcile(domain).await?);
        }
        Ok(reports)
    }
}
