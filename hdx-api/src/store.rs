//! In-memory store seeded from a JSON file.
//!
//! ```json
//! {
//!   "tenants": [{ "domain": "shop", "id": 7, "country": "ES", "language": "es" }],
//!   "users": [{ "id": "42", "username": "ana", "password_hash": "$2b$10$...",
//!               "name": "Ana", "language": "es", "role": "editor" }]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use hdx_auth::{IdentityLookup, IdentityStore, StoredIdentity};
use hdx_core::{StoreError, StoreResult, Tenant, TenantStore};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub domain: String,
    #[serde(flatten)]
    pub tenant: Tenant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub tenants: Vec<TenantRecord>,
    #[serde(default)]
    pub users: Vec<StoredIdentity>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tenants: HashMap<String, Tenant>,
    users: Vec<StoredIdentity>,
}

impl MemoryStore {
    pub fn from_seed(seed: Seed) -> StoreResult<Self> {
        let mut tenants = HashMap::new();
        for record in seed.tenants {
            if !record.tenant.is_registered() {
                return Err(StoreError::Corrupt {
                    key: record.domain,
                    reason: "tenant id must be non-zero".to_string(),
                });
            }
            tenants.insert(record.domain.to_ascii_lowercase(), record.tenant);
        }

        Ok(Self {
            tenants,
            users: seed.users,
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let seed: Seed = serde_json::from_slice(&raw)?;
        let store = Self::from_seed(seed)?;
        info!(
            path = %path.display(),
            tenants = store.tenants.len(),
            users = store.users.len(),
            "store seeded"
        );
        Ok(store)
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_by_domain(&self, domain: &str) -> StoreResult<Option<Tenant>> {
        Ok(self.tenants.get(domain).cloned())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find(&self, lookup: &IdentityLookup) -> StoreResult<Option<StoredIdentity>> {
        let found = self
            .users
            .iter()
            .filter(|user| !user.deleted)
            .find(|user| match lookup {
                IdentityLookup::Username(username) => &user.username == username,
                IdentityLookup::Subject(sub) => &user.id == sub,
            });
        Ok(found.cloned())
    }
}
