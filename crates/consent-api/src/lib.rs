//! Consent Ledger API
//!
//! HTTP surface for the consent ledger: route tree, handlers, DTOs, and
//! the extractors/middleware layered onto them. Grounded on
//! `openibank-api`'s crate shape (`state` + `routes` + `handlers` +
//! `error` + `extractors` + `middleware`, assembled into one `Router` by
//! `create_router`).

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod json_safety;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the full router: health and verify routes are public, consent
/// routes sit behind the tenant `AuthLayer`, admin routes are gated
/// per-handler by `RequireAdmin`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let auth_layer = state.auth.layer();

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::verify_routes())
        .merge(routes::admin_routes())
        .merge(routes::consent_routes().layer(auth_layer))
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers_middleware))
        .layer(axum::middleware::from_fn(middleware::timing_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(30)))
}
