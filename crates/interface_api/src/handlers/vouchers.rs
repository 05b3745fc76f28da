//! Main voucher handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use core_kernel::VoucherId;
use domain_ledger::Voucher;

use crate::dto::ledger::VoucherRequest;
use crate::extract::{Actor, ApiJson};
use crate::{error::ApiError, AppState};

/// Merges into the day's matching voucher or creates a new one
pub async fn post_voucher(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<VoucherRequest>,
) -> Result<Json<Voucher>, ApiError> {
    let posting = request.into_posting(actor.0);
    Ok(Json(state.engine.postings.update_main_account_voucher(posting).await?))
}

pub async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Voucher>, ApiError> {
    Ok(Json(state.engine.postings.voucher(VoucherId::from(id)).await?))
}
