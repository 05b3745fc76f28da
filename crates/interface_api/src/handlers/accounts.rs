//! Domain account handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use domain_ledger::{Domain, FundTransaction, TransactionType};

use crate::dto::ledger::*;
use crate::extract::{parse_domain, Actor, ApiJson};
use crate::{error::ApiError, AppState};

/// Current balance of one domain account
pub async fn get_balance(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let domain = parse_domain(&domain)?;
    let balance = state.engine.postings.get_balance(domain).await?;
    Ok(Json(BalanceResponse { domain, balance }))
}

/// Posts income, merging it into Main when a `voucher` object is given
pub async fn post_income(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    actor: Actor,
    ApiJson(request): ApiJson<PostingRequest>,
) -> Result<(StatusCode, Json<PostingResponse>), ApiError> {
    post(state, parse_domain(&domain)?, TransactionType::Income, actor, request).await
}

/// Posts an expense, merging it into Main when a `voucher` object is given
pub async fn post_expense(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    actor: Actor,
    ApiJson(request): ApiJson<PostingRequest>,
) -> Result<(StatusCode, Json<PostingResponse>), ApiError> {
    post(state, parse_domain(&domain)?, TransactionType::Expense, actor, request).await
}

async fn post(
    state: AppState,
    domain: Domain,
    transaction_type: TransactionType,
    actor: Actor,
    request: PostingRequest,
) -> Result<(StatusCode, Json<PostingResponse>), ApiError> {
    let mut posting = request.posting;
    posting.created_by = actor.or(posting.created_by.take());
    let postings = &state.engine.postings;

    let (transaction, voucher) = match (request.voucher, transaction_type) {
        (Some(options), TransactionType::Income) => {
            let (tx, voucher) = postings
                .post_income_with_voucher(domain, posting, &options.source_transaction_type)
                .await?;
            (tx, Some(voucher))
        }
        (Some(options), TransactionType::Expense) => {
            let (tx, voucher) = postings
                .post_expense_with_voucher(domain, posting, &options.source_transaction_type)
                .await?;
            (tx, Some(voucher))
        }
        (None, TransactionType::Income) => (postings.add_income(domain, posting).await?, None),
        (None, TransactionType::Expense) => (postings.add_expense(domain, posting).await?, None),
    };
    debug!(transaction_no = %transaction.transaction_no, merged = voucher.is_some(), "posting accepted");

    Ok((StatusCode::CREATED, Json(PostingResponse { transaction, voucher })))
}

/// Cash added to or withdrawn from a domain outside income/expense
pub async fn post_fund(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    actor: Actor,
    ApiJson(request): ApiJson<FundRequest>,
) -> Result<(StatusCode, Json<FundTransaction>), ApiError> {
    let domain = parse_domain(&domain)?;
    let mut movement = request.movement;
    movement.added_by = actor.or(movement.added_by.take());

    let fund = match request.direction {
        FundDirection::In => state.engine.postings.add_fund(domain, movement).await?,
        FundDirection::Out => state.engine.postings.withdraw_fund(domain, movement).await?,
    };
    Ok((StatusCode::CREATED, Json(fund)))
}
