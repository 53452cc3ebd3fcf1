//! Anonymous browser identity used to correlate visits and submissions.

use std::sync::Arc;

use uuid::Uuid;

use crate::storage::KeyValueStorage;

/// Storage key for the per-browser id.
pub const CLIENT_ID_KEY: &str = "glasslead_client_id";

/// Storage key for the per-tab id.
pub const SESSION_ID_KEY: &str = "glasslead_session_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// Survives across visits.
    Client,
    /// Scoped to one tab/session.
    Session,
}

/// Hands out stable identifiers, creating them on first use.
pub trait IdentityProvider: Send + Sync {
    fn get_or_create(&self, kind: IdentityKind) -> String;
}

/// Identity backed by a long-lived store (client id) and a session-scoped
/// store (session id).
pub struct StorageIdentityProvider {
    long_lived: Arc<dyn KeyValueStorage>,
    session: Arc<dyn KeyValueStorage>,
}

impl StorageIdentityProvider {
    pub fn new(long_lived: Arc<dyn KeyValueStorage>, session: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            long_lived,
            session,
        }
    }
}

impl IdentityProvider for StorageIdentityProvider {
    /// Storage failures still yield a fresh id; correlation is lost for
    /// that submission but the form keeps working.
    fn get_or_create(&self, kind: IdentityKind) -> String {
        let (storage, key) = match kind {
            IdentityKind::Client => (&self.long_lived, CLIENT_ID_KEY),
            IdentityKind::Session => (&self.session, SESSION_ID_KEY),
        };

        match storage.get(key) {
            Ok(Some(existing)) if Uuid::parse_str(&existing).is_ok() => return existing,
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, key, "Failed to read identity"),
        }

        let id = Uuid::new_v4().to_string();
        if let Err(e) = storage.set(key, &id) {
            tracing::warn!(error = %e, key, "Failed to persist identity");
        }
        id
    }
}
