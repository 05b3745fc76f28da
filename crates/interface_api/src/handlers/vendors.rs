//! Vendor payables handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use core_kernel::VendorId;
use domain_ledger::{AgingReport, PaymentOutcome, Purchase, PurchaseOutcome, VendorPayment};

use crate::dto::vendor::*;
use crate::extract::{Actor, ApiJson, ApiQuery};
use crate::{error::ApiError, AppState};

pub async fn register_vendor(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterVendorRequest>,
) -> Result<(StatusCode, Json<VendorResponse>), ApiError> {
    let vendor = state
        .engine
        .vendors
        .register_vendor(&request.name, request.credit_limit)
        .await?;
    Ok((StatusCode::CREATED, Json(vendor.into())))
}

/// Vendor balance plus its purchase and payment history
pub async fn get_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VendorDetailResponse>, ApiError> {
    let id = VendorId::from(id);
    let vendor = state.engine.vendors.vendor(id).await?;
    let transactions = state.engine.vendors.vendor_transactions(id).await?;
    Ok(Json(VendorDetailResponse {
        vendor: vendor.into(),
        transactions,
    }))
}

pub async fn record_purchase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    ApiJson(mut purchase): ApiJson<Purchase>,
) -> Result<(StatusCode, Json<PurchaseOutcome>), ApiError> {
    purchase.created_by = actor.or(purchase.created_by.take());
    let outcome = state.engine.vendors.record_purchase(VendorId::from(id), purchase).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Payment against the current due, optionally allocated to purchases
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    ApiJson(mut payment): ApiJson<VendorPayment>,
) -> Result<(StatusCode, Json<PaymentOutcome>), ApiError> {
    payment.created_by = actor.or(payment.created_by.take());
    let outcome = state.engine.vendors.record_payment(VendorId::from(id), payment).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Prepayment that may push the vendor into advance
pub async fn record_advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    ApiJson(mut payment): ApiJson<VendorPayment>,
) -> Result<(StatusCode, Json<PaymentOutcome>), ApiError> {
    payment.created_by = actor.or(payment.created_by.take());
    let outcome = state.engine.vendors.record_advance(VendorId::from(id), payment).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn aging_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiQuery(query): ApiQuery<AgingQuery>,
) -> Result<Json<AgingReport>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(|| state.engine.config().today());
    Ok(Json(state.engine.vendors.aging_report(VendorId::from(id), as_of).await?))
}
