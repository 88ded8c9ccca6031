//! Shared application state, grounded on `openibank-api::state::AppState`.

use std::sync::Arc;

use consent_auth::AuthService;
use consent_db::Database;

/// The server's own Ed25519 identity, used to auto-sign lineage
/// exports and consent proofs it builds. Private keys never travel
/// over the wire (spec section 4.B), so signing only happens when the
/// server is configured with its own keypair; requests that don't ask
/// for a signed artifact work the same with or without one.
pub struct SystemSigner {
    pub fingerprint: String,
    pub public_key_hex: String,
    pub private_key_hex: String,
}

impl SystemSigner {
    pub fn from_keypair(keypair: &consent_crypto::KeyPair) -> Self {
        Self {
            fingerprint: keypair.fingerprint(),
            public_key_hex: keypair.public_key_hex(),
            private_key_hex: keypair.private_key_hex(),
        }
    }

    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.fingerprint, &self.public_key_hex, &self.private_key_hex)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    pub system_signer: Option<Arc<SystemSigner>>,
    /// Append-only external anchor commit file (spec section 6). `None`
    /// means `POST /admin/anchors/snapshot` never persists to disk, only
    /// returns the snapshot.
    pub anchor_file_path: Option<Arc<std::path::PathBuf>>,
}

impl AppState {
    pub fn new(db: Database, auth: AuthService) -> Self {
        Self {
            db: Arc::new(db),
            auth: Arc::new(auth),
            system_signer: None,
            anchor_file_path: None,
        }
    }

    pub fn with_system_signer(mut self, signer: SystemSigner) -> Self {
        self.system_signer = Some(Arc::new(signer));
        self
    }

    pub fn with_anchor_file_path(mut self, path: std::path::PathBuf) -> Self {
        self.anchor_file_path = Some(Arc::new(path));
        self
    }

    pub fn signer_tuple(&self) -> Option<(&str, &str, &str)> {
        self.system_signer.as_deref().map(SystemSigner::as_tuple)
    }
}
