//! API middleware

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

use crate::extract::ACTOR_HEADER;

/// Request logging middleware
///
/// One event per request with method, path, operator, status and latency.
/// Server errors are logged at `warn`.
pub async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        warn!(method = %method, uri = %uri, user = %user, status = status.as_u16(), duration_ms, "API request");
    } else {
        info!(method = %method, uri = %uri, user = %user, status = status.as_u16(), duration_ms, "API request");
    }

    response
}
