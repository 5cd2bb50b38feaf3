use anyhow::Result;
use async_trait::async_trait;
use hdx_core::{bail_hdx, ConnectionContext, GatewayRequest, ModuleCapabilities, Reply, ResourceModule};

/// The caller's own identity, exactly as carried by the session token.
pub struct UsersModule;

#[async_trait]
impl ResourceModule for UsersModule {
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::read_only()
    }

    async fn get(&self, ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        let Some(identity) = ctx.identity.as_ref() else {
            bail_hdx!(token_invalid, "no session");
        };
        Ok(Reply::ok(serde_json::to_value(identity)?))
    }
}
