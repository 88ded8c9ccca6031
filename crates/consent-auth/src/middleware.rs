//! Authentication middleware for Axum, grounded on
//! `openibank-auth::middleware`'s tower `Layer`/`Service` shape,
//! narrowed to the consent ledger's single tenant-API-key auth method.
//! Requests without credentials pass through unauthenticated; handlers
//! that require a caller use the `RequireAuth` extractor to reject them.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    response::Response,
};
use tower::{Layer, Service};

use crate::api_key::{extract_raw_api_key, ApiKeyService};
use crate::error::AuthError;
use crate::rate_limit::RateLimiter;
use crate::types::AuthenticatedCaller;

#[derive(Clone)]
pub struct AuthLayer {
    api_key: Arc<ApiKeyService>,
    rate_limiter: Arc<RateLimiter>,
}

impl AuthLayer {
    pub fn new(api_key: Arc<ApiKeyService>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self { api_key, rate_limiter }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            api_key: self.api_key.clone(),
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    api_key: Arc<ApiKeyService>,
    rate_limiter: Arc<RateLimiter>,
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let api_key = self.api_key.clone();
        let rate_limiter = self.rate_limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(raw_key) = extract_raw_api_key(req.headers()) else {
                return inner.call(req).await;
            };

            match api_key.authenticate(&raw_key).await {
                Ok(row) => {
                    if let Err(err) = rate_limiter.check(&row.id.to_string()).await {
                        return Ok(crate::extractors::auth_error_response(err));
                    }

                    let caller = AuthenticatedCaller {
                        tenant_id: row.tenant_id,
                        api_key_id: row.id,
                    };
                    let (mut parts, body) = req.into_parts();
                    parts.extensions.insert(caller);
                    inner.call(Request::from_parts(parts, body)).await
                }
                Err(err) => Ok(crate::extractors::auth_error_response(err)),
            }
        })
    }
}

/// Extractor requiring a previously authenticated caller; rejects with
/// 401 `AUTH_MISSING` if the middleware found no credentials.
pub struct RequireAuth(pub AuthenticatedCaller);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedCaller>()
            .cloned()
            .map(RequireAuth)
            .ok_or_else(|| crate::extractors::auth_error_response(AuthError::Missing))
    }
}
