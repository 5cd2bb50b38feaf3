use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use hdx_auth::{LoginRequest, SessionIssuer};
use hdx_core::{ConnectionContext, GatewayRequest, ModuleCapabilities, Reply, ResourceModule, Verb};

/// `POST` logs in, `PATCH` renews the current session.
pub struct SessionsModule {
    pub sessions: Arc<SessionIssuer>,
}

#[async_trait]
impl ResourceModule for SessionsModule {
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::from_verbs(vec![Verb::Post, Verb::Patch])
    }

    async fn post(&self, ctx: &mut ConnectionContext, req: &GatewayRequest) -> Result<Reply> {
        let login = LoginRequest::from_gateway(req);
        let grant = self.sessions.login(ctx, &login).await?;
        Ok(Reply::ok(serde_json::to_value(grant)?))
    }

    async fn patch(&self, ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        let grant = self.sessions.renew(ctx).await?;
        Ok(Reply::ok(serde_json::to_value(grant)?))
    }
}
