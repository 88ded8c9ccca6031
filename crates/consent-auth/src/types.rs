//! Request-scoped authentication context types.

use uuid::Uuid;

/// The authenticated tenant API key attached to a request by
/// `AuthMiddleware`, grounded on `openibank-auth::types::AuthenticatedUser`.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    pub tenant_id: Uuid,
    pub api_key_id: Uuid,
}
