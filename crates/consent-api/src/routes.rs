//! Route tree, grounded on `openibank-api::routes`'s nested-`Router`
//! shape. Write and proof routes sit behind `consent-auth`'s tenant
//! `AuthLayer` (applied once in `lib.rs`); admin routes are gated
//! per-handler by the `RequireAdmin` extractor instead since they use a
//! separate credential namespace; verify and health routes are public.

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn consent_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/consents", post(handlers::consents::create_consent))
        .route("/consents", put(handlers::consents::update_consent))
        .route("/consents/{id}/revoke", post(handlers::consents::revoke_consent))
        .route("/consents/{id}/lineage", get(handlers::lineage::get_lineage))
        .route("/consents/{id}/lineage/export", get(handlers::lineage::export_lineage))
        .route("/consents/{id}/proof", post(handlers::proofs::create_proof))
}

pub fn verify_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lineage/verify", post(handlers::verify::verify_lineage))
        .route("/proofs/verify", post(handlers::verify::verify_proof))
        .route("/anchors/verify", post(handlers::verify::verify_anchors))
        .route("/system/verify", post(handlers::verify::verify_system))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/tenants", post(handlers::admin::create_tenant))
        .route("/admin/tenants/{id}/lifecycle", patch(handlers::admin::transition_lifecycle))
        .route("/admin/tenants/{id}/api-keys", post(handlers::admin::create_api_key))
        .route("/admin/tenants/{id}/api-keys", get(handlers::admin::list_api_keys))
        .route("/admin/tenants/{id}/webhooks", post(handlers::admin::create_webhook_endpoint))
        .route("/admin/anchors/snapshot", post(handlers::anchors::create_snapshot))
        .route("/admin/system/export", get(handlers::system::export_system_events))
        .route("/admin/system/verify", get(handlers::system::verify_system_events))
}

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/live", get(handlers::health::live))
        .route("/ready", get(handlers::health::ready))
}
