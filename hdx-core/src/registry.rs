use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::context::ConnectionContext;
use crate::errors::HdxError;
use crate::module::{Reply, ResourceModule, Verb};
use crate::request::GatewayRequest;

/// Maps resource names to modules.
///
/// Filled once at startup and then shared read-only with the pipeline, so
/// the set of resources is fixed for the life of the process.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn ResourceModule>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module under a given name, replacing any previous one.
    pub fn register<S>(&mut self, name: S, module: Arc<dyn ResourceModule>) -> &mut Self
    where
        S: Into<String>,
    {
        self.modules.insert(name.into(), module);
        self
    }

    pub fn exists(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ResourceModule>> {
        self.modules.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Call the entry point for `verb` on the module registered as `name`.
    pub async fn dispatch(
        &self,
        name: &str,
        verb: Verb,
        ctx: &mut ConnectionContext,
        req: &GatewayRequest,
    ) -> Result<Reply> {
        let module = self
            .get(name)
            .ok_or_else(|| HdxError::resource_not_found(name).into_anyhow())?;

        match verb {
            Verb::Get => module.get(ctx, req).await,
            Verb::Post => module.post(ctx, req).await,
            Verb::Put => module.put(ctx, req).await,
            Verb::Patch => module.patch(ctx, req).await,
            Verb::Delete => module.delete(ctx, req).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::errors::ErrorKind;
    use crate::module::ModuleCapabilities;
    use crate::tenant::Tenant;

    struct Ping;

    #[async_trait]
    impl ResourceModule for Ping {
        fn capabilities(&self) -> ModuleCapabilities {
            ModuleCapabilities::read_only()
        }

        async fn get(&self, ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
            Ok(Reply::ok(json!({ "pong": ctx.domain })))
        }
    }

    fn ctx() -> ConnectionContext {
        ConnectionContext::new("shop", "fp", 1000, Arc::new(Tenant::placeholder()))
    }

    #[tokio::test]
    async fn dispatches_by_verb() {
        let mut registry = ModuleRegistry::new();
        registry.register("ping", Arc::new(Ping));
        let req = GatewayRequest::new("GET", "shop", "/api/ping");

        let reply = registry.dispatch("ping", Verb::Get, &mut ctx(), &req).await.unwrap();
        assert_eq!(reply.body, Some(json!({ "pong": "shop" })));
    }

    #[tokio::test]
    async fn unimplemented_verbs_are_not_allowed() {
        let mut registry = ModuleRegistry::new();
        registry.register("ping", Arc::new(Ping));
        let req = GatewayRequest::new("DELETE", "shop", "/api/ping");

        for verb in [Verb::Post, Verb::Put, Verb::Patch, Verb::Delete] {
            let err = registry.dispatch("ping", verb, &mut ctx(), &req).await.unwrap_err();
            assert_eq!(
                HdxError::from_anyhow(&err).map(|e| e.kind),
                Some(ErrorKind::MethodNotSupported)
            );
        }
    }

    #[tokio::test]
    async fn unknown_names_are_not_found() {
        let registry = ModuleRegistry::new();
        let req = GatewayRequest::new("GET", "shop", "/api/nope");

        assert!(!registry.exists("nope"));
        let err = registry.dispatch("nope", Verb::Get, &mut ctx(), &req).await.unwrap_err();
        assert_eq!(
            HdxError::from_anyhow(&err).map(|e| e.kind),
            Some(ErrorKind::ResourceNotFound)
        );
    }
}
