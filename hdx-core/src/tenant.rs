//! Multi-tenant types and the process-wide tenant cache.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::errors::{HdxError, HdxResult};
use crate::store::StoreResult;

/// Business configuration resolved from the request host.
///
/// An `id` of zero marks a domain that is known not to be registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: u64,
    pub country: String,
    pub language: String,
}

impl Tenant {
    /// Cached stand-in for a domain the store does not know.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.id != 0
    }
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_domain(&self, domain: &str) -> StoreResult<Option<Tenant>>;
}

/// Derive the tenant domain from a `Host` header value.
///
/// Lower-cases, drops a `:port` and strips `suffix` when present:
/// `Shop.Example.com:9090` with suffix `.example.com` gives `shop`.
pub fn domain_from_host(host: &str, suffix: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    let host = strip_port(&host);
    let suffix = suffix.to_ascii_lowercase();
    host.strip_suffix(suffix.as_str()).unwrap_or(host).to_string()
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        // `[::1]:8080` or `name:8080`, but not a bare IPv6 literal
        Some((name, port))
            if !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (name.ends_with(']') || !name.contains(':')) =>
        {
            name
        }
        _ => host,
    }
}

type TenantSlot = Arc<OnceCell<Arc<Tenant>>>;

/// Resolves domains to tenants, caching every answer for the process lifetime.
///
/// Each domain owns one `OnceCell`. Concurrent first requests for the same
/// domain wait on the same initialization, so the store is queried once.
/// Store failures leave the cell empty and the next request retries.
pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    cache: DashMap<String, TenantSlot>,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    /// Look up the tenant for `domain`.
    ///
    /// Fails with `TenantNotFound` for unregistered domains and with
    /// `StorageUnavailable` when the store errors.
    pub async fn resolve(&self, domain: &str) -> HdxResult<Arc<Tenant>> {
        let slot = self.slot(domain);

        let tenant = slot
            .get_or_try_init(|| async {
                debug!(domain, "tenant cache miss");
                let found = self.store.find_by_domain(domain).await?;
                Ok::<_, crate::store::StoreError>(Arc::new(found.unwrap_or_else(Tenant::placeholder)))
            })
            .await
            .map_err(|e| {
                warn!(domain, error = %e, "tenant lookup failed");
                HdxError::storage_unavailable(e.into()).into_anyhow()
            })?;

        if !tenant.is_registered() {
            return Err(HdxError::tenant_not_found(domain).into_anyhow());
        }

        Ok(Arc::clone(tenant))
    }

    /// Drop the cached answer for one domain.
    pub fn invalidate(&self, domain: &str) -> bool {
        self.cache.remove(domain).is_some()
    }

    /// Number of domains with a cache slot, settled or not.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn slot(&self, domain: &str) -> TenantSlot {
        if let Some(slot) = self.cache.get(domain) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.cache.entry(domain.to_string()).or_default().value())
    }
}
