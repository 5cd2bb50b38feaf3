use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use hdx_auth::SessionIssuer;
use hdx_core::{ConnectionContext, GatewayRequest, ModuleCapabilities, Reply, ResourceModule};
use serde::Serialize;

/// First call of every client: tenant locale, server clock and a verifier for
/// the login handshake.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub app_country: String,
    pub app_language: String,
    pub server_time: i64,
    pub verifier: String,
}

pub struct InitModule {
    pub sessions: Arc<SessionIssuer>,
}

#[async_trait]
impl ResourceModule for InitModule {
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::read_only()
    }

    async fn get(&self, ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        let payload = InitPayload {
            app_country: ctx.tenant.country.clone(),
            app_language: ctx.tenant.language.clone(),
            server_time: ctx.request_time,
            verifier: self
                .sessions
                .verifiers()
                .issue(&ctx.fingerprint, &ctx.domain, ctx.request_time),
        };
        Ok(Reply::ok(serde_json::to_value(payload)?))
    }
}
