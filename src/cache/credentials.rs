use super::{Cache, MemoryCache};
use crate::error::Result;
use crate::models::RoleCredentials;
use std::fmt;
use std::sync::Arc;

/// Role credential cache over any [`Cache`] store.
///
/// Entries are JSON in the AWS CLI credential shape and are checked for expiry
/// lazily on read; nothing is swept.
#[derive(Clone)]
pub struct CredentialCache {
    store: Arc<dyn Cache>,
}

impl CredentialCache {
    /// Use `store`, or a fresh in-memory store when `None`.
    pub fn new(store: Option<Arc<dyn Cache>>) -> Self {
        Self {
            store: store.unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn Cache>),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Composite key for one start URL, account and role.
    pub fn cache_key(start_url: &str, account_id: &str, role_name: &str) -> String {
        format!("aws-sso-creds-{}-{}-{}", start_url, account_id, role_name)
    }

    /// Get cached credentials, `None` on a miss or once past their expiration
    pub fn get_credentials(&self, key: &str) -> Result<Option<RoleCredentials>> {
        let Some(data) = self.store.get(key)? else {
            return Ok(None);
        };

        let creds: RoleCredentials = serde_json::from_slice(&data)?;
        if creds.is_expired() {
            tracing::debug!(expires_at = %creds.expiration, "Cached credentials are expired");
            return Ok(None);
        }

        Ok(Some(creds))
    }

    pub fn save_credentials(&self, key: &str, creds: &RoleCredentials) -> Result<()> {
        let data = serde_json::to_vec(creds)?;
        self.store.put(key, &data)
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCache").finish_non_exhaustive()
    }
}
