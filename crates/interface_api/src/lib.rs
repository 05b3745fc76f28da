//! HTTP API Layer
//!
//! REST surface of the clinic ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource (accounts, transactions, vouchers,
//!   statements, vendors, reconciliation)
//! - **Middleware**: request logging
//! - **DTOs**: request/response bodies around the ledger types
//! - **Error Handling**: `LedgerError` mapped onto HTTP statuses
//! - **Background**: periodic reconciliation
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(engine));
//! axum::serve(listener, app).await?;
//! ```

pub mod background;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_ledger::LedgerEngine;

use crate::handlers::{accounts, health, reconciliation, statements, transactions, vendors, vouchers};
use crate::middleware::request_log_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: LedgerEngine,
    /// Storage adapter pinged by the readiness check
    pub health: Option<Arc<dyn HealthCheckable>>,
}

impl AppState {
    pub fn new(engine: LedgerEngine) -> Self {
        Self {
            engine,
            health: None,
        }
    }

    pub fn with_health_check(mut self, adapter: Arc<dyn HealthCheckable>) -> Self {
        self.health = Some(adapter);
        self
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Ledger engine and optional health check
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let account_routes = Router::new()
        .route("/:domain/balance", get(accounts::get_balance))
        .route("/:domain/income", post(accounts::post_income))
        .route("/:domain/expense", post(accounts::post_expense))
        .route("/:domain/funds", post(accounts::post_fund))
        .route("/:domain/statements/daily", get(statements::daily_statement))
        .route("/:domain/statements/ledger", get(statements::ledger_statement))
        .route("/:domain/summary", get(statements::period_summary));

    let transaction_routes = Router::new()
        .route(
            "/:id",
            get(transactions::get_transaction).put(transactions::update_transaction),
        )
        .route("/:id/reverse", post(transactions::reverse_transaction));

    let voucher_routes = Router::new()
        .route("/", post(vouchers::post_voucher))
        .route("/:id", get(vouchers::get_voucher));

    let vendor_routes = Router::new()
        .route("/", post(vendors::register_vendor))
        .route("/:id", get(vendors::get_vendor))
        .route("/:id/purchases", post(vendors::record_purchase))
        .route("/:id/payments", post(vendors::record_payment))
        .route("/:id/advances", post(vendors::record_advance))
        .route("/:id/aging", get(vendors::aging_report));

    let api_routes = Router::new()
        .nest("/accounts", account_routes)
        .nest("/transactions", transaction_routes)
        .nest("/vouchers", voucher_routes)
        .nest("/vendors", vendor_routes)
        .route("/reconciliation", get(reconciliation::reconcile_all))
        .layer(axum_middleware::from_fn(request_log_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
