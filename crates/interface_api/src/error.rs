//! API error handling

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_ledger::LedgerError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Business rule refused the operation; nothing was posted
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone()),
            ApiError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone()),
        };
        if status.is_server_error() {
            error!(error = %message, "request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        if err.is_validation() {
            ApiError::Validation(err.to_string())
        } else if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else if err.is_business_rule() {
            ApiError::Conflict(err.to_string())
        } else if let LedgerError::Storage(port) = &err {
            ApiError::Storage(port.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation(e.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::Domain;
    use rust_decimal_macros::dec;

    fn status_of(err: LedgerError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_ledger_errors_map_to_statuses() {
        assert_eq!(status_of(LedgerError::validation("amount must be positive")), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(LedgerError::UnknownDomain("pharmacy".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(LedgerError::TransactionNotFound("TXN-1".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(LedgerError::InsufficientBalance {
                domain: Domain::Optics,
                balance: dec!(10),
                requested: dec!(20),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LedgerError::Storage(core_kernel::PortError::connection("down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
