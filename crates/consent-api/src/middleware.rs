//! Cross-cutting middleware, grounded on
//! `openibank-api::middleware::{timing_middleware,
//! security_headers_middleware}`.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Logs request latency; slow requests (>1s) log at `warn`.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;
    let elapsed = start.elapsed();

    if elapsed.as_millis() > 1000 {
        tracing::warn!(method = %method, uri = %uri, elapsed_ms = elapsed.as_millis(), "slow request");
    } else {
        tracing::debug!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed.as_millis(),
            status = response.status().as_u16(),
            "request completed"
        );
    }

    response
}

/// Defensive response headers applied to every response, including
/// error envelopes.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());
    headers.insert("Referrer-Policy", "strict-origin-when-cross-origin".parse().unwrap());
    headers.insert("Cache-Control", "no-store, no-cache, must-revalidate".parse().unwrap());
    response
}
