use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::context::ConnectionContext;
use crate::errors::HdxError;
use crate::request::GatewayRequest;

/// HTTP verbs a resource module can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete];

    /// Map an HTTP method name. Anything else (HEAD, OPTIONS, ...) is `None`.
    pub fn parse(method: &str) -> Option<Verb> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "PATCH" => Some(Verb::Patch),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which verbs a module answers with something other than 405.
#[derive(Debug, Clone, Default)]
pub struct ModuleCapabilities {
    pub allowed: Vec<Verb>,
}

impl ModuleCapabilities {
    pub fn from_verbs(verbs: Vec<Verb>) -> Self {
        Self { allowed: verbs }
    }

    pub fn read_only() -> Self {
        Self::from_verbs(vec![Verb::Get])
    }

    pub fn allows(&self, verb: Verb) -> bool {
        self.allowed.contains(&verb)
    }
}

/// What a module hands back to the pipeline on success.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }
}

/// A named resource, addressed by the first path segment.
///
/// Each verb has its own entry point. The defaults answer 405, so a module
/// only overrides what it supports and every other verb is still an explicit
/// "not allowed" rather than a silent no-op. Errors are `HdxError`s inside
/// `anyhow::Error`; anything else is rendered as a 500.
#[async_trait]
pub trait ResourceModule: Send + Sync {
    /// Verbs this module implements. Used for logging and route summaries;
    /// dispatch always goes through the verb methods.
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::default()
    }

    async fn get(&self, _ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        Err(HdxError::method_not_supported(Verb::Get).into_anyhow())
    }

    async fn post(&self, _ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        Err(HdxError::method_not_supported(Verb::Post).into_anyhow())
    }

    async fn put(&self, _ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        Err(HdxError::method_not_supported(Verb::Put).into_anyhow())
    }

    async fn patch(&self, _ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        Err(HdxError::method_not_supported(Verb::Patch).into_anyhow())
    }

    async fn delete(&self, _ctx: &mut ConnectionContext, _req: &GatewayRequest) -> Result<Reply> {
        Err(HdxError::method_not_supported(Verb::Delete).into_anyhow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_case_insensitively() {
        assert_eq!(Verb::parse("get"), Some(Verb::Get));
        assert_eq!(Verb::parse("PATCH"), Some(Verb::Patch));
        assert_eq!(Verb::parse("HEAD"), None);
        assert_eq!(Verb::parse("OPTIONS"), None);
    }

    #[test]
    fn read_only_allows_get_only() {
        let caps = ModuleCapabilities::read_only();
        assert!(caps.allows(Verb::Get));
        for verb in [Verb::Post, Verb::Put, Verb::Patch, Verb::Delete] {
            assert!(!caps.allows(verb), "{}", verb.as_str());
        }

        let caps = ModuleCapabilities::from_verbs(vec![Verb::Post, Verb::Patch]);
        assert!(caps.allows(Verb::Patch));
        assert!(!caps.allows(Verb::Get));
    }
}
