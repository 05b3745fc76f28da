//! Periodic reconciliation
//!
//! Replays every domain's history on a fixed interval and logs any account
//! whose live balance has drifted from it.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use domain_ledger::{LedgerEngine, LedgerError, ReconciliationReport};

/// Runs one reconciliation pass and returns the drifted reports
pub async fn reconcile_once(engine: &LedgerEngine) -> Result<Vec<ReconciliationReport>, LedgerError> {
    let reports = engine.reconciler.reconcile_all().await?;
    let drifted: Vec<_> = reports.into_iter().filter(|r| !r.is_consistent).collect();
    for report in &drifted {
        warn!(
            domain = %report.domain,
            live = %report.live_balance,
            recomputed = %report.recomputed_balance,
            drift = %report.drift,
            "ledger balance drift"
        );
    }
    if drifted.is_empty() {
        debug!("reconciliation clean");
    }
    Ok(drifted)
}

/// Spawns the reconciliation loop; it exits when `shutdown` flips to true
pub fn spawn_reconciliation(
    engine: LedgerEngine,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(period_secs = period.as_secs(), "reconciliation task started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = reconcile_once(&engine).await {
                        error!(error = %e, "reconciliation failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("reconciliation task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::{Domain, InMemoryLedgerStore, LedgerConfig, NewPosting};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn engine() -> LedgerEngine {
        LedgerEngine::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_clean_ledger_reports_no_drift() {
        let engine = engine();
        engine
            .postings
            .add_income(Domain::Hospital, NewPosting::new(dec!(250), "OPD Income", "ticket"))
            .await
            .unwrap();
        assert!(reconcile_once(&engine).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let handle = spawn_reconciliation(engine(), Duration::from_millis(10), rx);
        tokio::time::sleep(Duration::from_millis(35)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
