//! Statement and summary handlers

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use domain_ledger::PeriodSummary;

use crate::dto::ledger::{RangeQuery, StatementFormat};
use crate::extract::{parse_domain, ApiQuery};
use crate::{error::ApiError, AppState};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

fn csv_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], body).into_response()
}

/// One row per day with category buckets and the carried balance
pub async fn daily_statement(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Response, ApiError> {
    let domain = parse_domain(&domain)?;
    let statement = state
        .engine
        .statements
        .daily_statement(domain, query.from, query.to)
        .await?;
    Ok(match query.format {
        StatementFormat::Json => Json(statement).into_response(),
        StatementFormat::Csv => csv_response(statement.to_csv()?),
    })
}

/// Running-balance ledger
pub async fn ledger_statement(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Response, ApiError> {
    let domain = parse_domain(&domain)?;
    let statement = state
        .engine
        .statements
        .account_statement(domain, query.from, query.to)
        .await?;
    Ok(match query.format {
        StatementFormat::Json => Json(statement).into_response(),
        StatementFormat::Csv => csv_response(statement.to_csv()?),
    })
}

pub async fn period_summary(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Json<PeriodSummary>, ApiError> {
    let domain = parse_domain(&domain)?;
    let summary = state
        .engine
        .statements
        .period_summary(domain, query.from, query.to)
        .await?;
    Ok(Json(summary))
}
