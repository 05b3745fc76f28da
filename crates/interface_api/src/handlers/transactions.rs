//! Transaction handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use core_kernel::TransactionId;
use domain_ledger::{Reversal, Transaction};

use crate::dto::ledger::*;
use crate::extract::{Actor, ApiJson};
use crate::{error::ApiError, AppState};

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(state.engine.postings.transaction(TransactionId::from(id)).await?))
}

/// Corrects an income or expense; the stored type decides which
pub async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let updated = state
        .engine
        .postings
        .update_transaction(TransactionId::from(id), request.into())
        .await?;
    Ok(Json(updated))
}

pub async fn reverse_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    ApiJson(request): ApiJson<ReverseRequest>,
) -> Result<(StatusCode, Json<Reversal>), ApiError> {
    let reversal = state
        .engine
        .postings
        .reverse_transaction(TransactionId::from(id), &request.reason, actor.0)
        .await?;
    Ok((StatusCode::CREATED, Json(reversal)))
}
