//! Reconciliation handler

use axum::{extract::State, Json};

use domain_ledger::ReconciliationReport;

use crate::{error::ApiError, AppState};

/// Live balance against replayed history for every domain
pub async fn reconcile_all(State(state): State<AppState>) -> Result<Json<Vec<ReconciliationReport>>, ApiError> {
    Ok(Json(state.engine.reconciler.reconcile_all().await?))
}
