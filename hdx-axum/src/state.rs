use std::sync::Arc;

use hdx_core::HdxConfigSnapshot;
use serde::{Deserialize, Serialize};

use crate::gateway::Gateway;

/// Routing knobs read from the `gateway.` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Stripped from the host to get the tenant domain.
    pub domain_suffix: String,
    /// Stripped from the path before the resource segment.
    pub path_prefix: String,
    /// Header the fronting proxy puts the client address in.
    pub origin_header: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            domain_suffix: ".example.com".to_string(),
            path_prefix: "/api/".to_string(),
            origin_header: hdx_auth::DEFAULT_ORIGIN_HEADER.to_string(),
        }
    }
}

impl GatewaySettings {
    pub fn from_snapshot(snapshot: &HdxConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            domain_suffix: snapshot
                .get_string("gateway.domain_suffix")
                .unwrap_or(defaults.domain_suffix),
            path_prefix: snapshot
                .get_string("gateway.path_prefix")
                .unwrap_or(defaults.path_prefix),
            origin_header: snapshot
                .get_string("gateway.origin_header")
                .unwrap_or(defaults.origin_header),
        }
    }
}

pub struct HdxAxumState {
    pub gateway: Arc<Gateway>,
}

impl Clone for HdxAxumState {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl HdxAxumState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}
