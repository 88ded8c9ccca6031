//! Request extractors, grounded on `openibank-api::extractors`.

use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use consent_auth::AuthenticatedCaller;
use consent_types::contract::{resolve_api_version, MAX_VERIFY_BODY_BYTES};

use crate::error::ApiError;
use crate::json_safety::parse_strict;
use crate::state::AppState;

/// The `X-Admin-Api-Key` namespace, a separate credential from tenant
/// API keys (spec section 6). Only reachable with the router's
/// concrete state since admin verification needs no per-request
/// identity beyond the one configured server-side secret.
pub struct RequireAdmin;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let key = consent_auth::admin::extract_admin_key(&parts.headers);
        state
            .auth
            .admin
            .verify(key.as_deref())
            .map(|_| RequireAdmin)
            .map_err(|err| ApiError::Auth(err).into_response())
    }
}

/// The authenticated tenant API key, required. Rejects with
/// `AUTH_MISSING` if `consent-auth`'s middleware found no credentials.
pub struct RequireTenant(pub AuthenticatedCaller);

#[async_trait]
impl<S> FromRequestParts<S> for RequireTenant
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedCaller>()
            .cloned()
            .map(RequireTenant)
            .ok_or_else(|| ApiError::Auth(consent_auth::AuthError::Missing).into_response())
    }
}

/// Strict-JSON body extractor: rejects non-object top level, duplicate
/// object keys at any depth, and bodies over `max_bytes`.
pub struct StrictJson<T>(pub T);

impl<T: DeserializeOwned> StrictJson<T> {
    async fn from_bytes(bytes: Bytes, max_bytes: usize) -> Result<T, ApiError> {
        if bytes.len() > max_bytes {
            return Err(ApiError::Validation(format!(
                "request body exceeds {max_bytes} bytes"
            )));
        }
        parse_strict(&bytes).map_err(ApiError::Validation)
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for StrictJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.to_string()).into_response())?;
        Self::from_bytes(bytes, MAX_VERIFY_BODY_BYTES)
            .await
            .map(StrictJson)
            .map_err(|e| e.into_response())
    }
}

/// `Idempotency-Key` header, required on write routes.
pub struct IdempotencyKey(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get("idempotency-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(IdempotencyKey(key))
    }
}

/// Resolved `X-API-Version`, validated against the supported set.
pub struct ApiVersion(pub &'static str);

#[async_trait]
impl<S> FromRequestParts<S> for ApiVersion
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(consent_types::contract::API_VERSION_HEADER)
            .and_then(|v| v.to_str().ok());
        resolve_api_version(header)
            .map(ApiVersion)
            .map_err(|msg| ApiError::Validation(msg).into_response())
    }
}

/// Best-effort client IP, never fails extraction.
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let ip = headers
            .get("X-Real-IP")
            .or_else(|| headers.get("X-Forwarded-For"))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(ip))
    }
}

/// Request correlation ID: reuses `x-request-id` if present (set by
/// `tower_http::request_id`), otherwise generates one.
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(RequestId(id))
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

impl PaginationParams {
    pub fn clamped_limit(&self, max: u32) -> i64 {
        self.limit.clamp(1, max) as i64
    }

    pub fn offset(&self) -> i64 {
        self.offset as i64
    }
}

pub struct Pagination(pub PaginationParams);

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PaginationParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(e.to_string()).into_response())?;
        Ok(Pagination(params))
    }
}
