//! Extractors that report failures as [`ApiError`]

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;

use domain_ledger::Domain;

use crate::error::ApiError;

/// Header naming the operator behind a request
pub const ACTOR_HEADER: &str = "x-user-id";

/// JSON body; malformed input becomes a 400 or 422 in the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string, rejected as 422
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Operator recorded as `created_by`, taken from [`ACTOR_HEADER`]
#[derive(Debug, Clone, Default)]
pub struct Actor(pub Option<String>);

impl Actor {
    /// Body value first, then the header
    pub fn or(&self, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.0.clone())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Actor(actor))
    }
}

/// Parses the `:domain` path segment
pub fn parse_domain(raw: &str) -> Result<Domain, ApiError> {
    Ok(raw.parse::<Domain>()?)
}
