//! The request pipeline.
//!
//! One pass per request, strictly in order: domain, route, fingerprint,
//! tenant, credentials, module lookup, verb, dispatch. The first failing step
//! decides the response.

use std::sync::Arc;

use anyhow::Result;
use hdx_auth::{fingerprint_request, AuthenticationStrategy};
use hdx_core::{
    domain_from_host, route_from_path, Clock, ConnectionContext, GatewayRequest, HdxError,
    ModuleRegistry, TenantResolver, Verb,
};
use tracing::{debug, info_span, Instrument};

use crate::envelope::Envelope;
use crate::error::HdxAxumError;
use crate::state::GatewaySettings;

pub struct Gateway {
    registry: ModuleRegistry,
    resolver: TenantResolver,
    strategy: Arc<dyn AuthenticationStrategy>,
    settings: GatewaySettings,
    clock: Arc<dyn Clock>,
}

impl Gateway {
    /// The registry is frozen from here on.
    pub fn new(
        registry: ModuleRegistry,
        resolver: TenantResolver,
        strategy: Arc<dyn AuthenticationStrategy>,
        settings: GatewaySettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            resolver,
            strategy,
            settings,
            clock,
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Run one request through the pipeline. Never fails: every error is
    /// rendered into the envelope.
    pub async fn handle(&self, req: GatewayRequest) -> Envelope {
        let now = self.clock.now();
        let domain = domain_from_host(&req.host, &self.settings.domain_suffix);
        let (resource, sub_path) = route_from_path(&req.path, &self.settings.path_prefix);

        let span = info_span!(
            "gateway",
            domain = domain.as_str(),
            resource = resource.as_str(),
            method = req.method.as_str()
        );
        async move {
            match self.run(&req, domain, resource, sub_path, now).await {
                Ok(envelope) => envelope,
                Err(err) => HdxAxumError::from(err).into_envelope(),
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        req: &GatewayRequest,
        domain: String,
        resource: String,
        sub_path: Option<String>,
        now: i64,
    ) -> Result<Envelope> {
        let fingerprint = fingerprint_request(req, &self.settings.origin_header, &domain);

        let tenant = self.resolver.resolve(&domain).await?;

        let mut ctx = ConnectionContext::new(domain, fingerprint, now, tenant).with_route(resource, sub_path);

        ctx.identity = self.strategy.authenticate(&ctx, req).await?;

        if !self.registry.exists(&ctx.resource) {
            return Err(HdxError::resource_not_found(&ctx.resource).into_anyhow());
        }

        let verb = Verb::parse(&req.method)
            .ok_or_else(|| HdxError::method_not_supported(&req.method).into_anyhow())?;

        let resource = ctx.resource.clone();
        let reply = self.registry.dispatch(&resource, verb, &mut ctx, req).await?;

        debug!(
            status = reply.status,
            authenticated = ctx.is_authenticated(),
            "dispatched"
        );

        ctx.response.set(reply.status, reply.body);
        Ok(Envelope::from(ctx.response))
    }
}
