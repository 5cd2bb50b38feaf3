// Authentication strategies.

use async_trait::async_trait;
use hdx_core::{ConnectionContext, GatewayRequest, HdxError, HdxResult, Identity};
use tracing::debug;

use crate::options::AuthOptions;
use crate::session::SessionTokens;

/// Turns request credentials into an identity.
///
/// `Ok(None)` means the request carries no credentials for this strategy and
/// proceeds unauthenticated. Credentials that are present but unusable are
/// an error.
#[async_trait]
pub trait AuthenticationStrategy: Send + Sync {
    async fn authenticate(&self, ctx: &ConnectionContext, req: &GatewayRequest) -> HdxResult<Option<Identity>>;
}

#[derive(Clone, Debug)]
pub struct HdxTokenStrategyOptions {
    pub header: String,
    pub scheme: String,
}

impl Default for HdxTokenStrategyOptions {
    fn default() -> Self {
        Self {
            header: "authorization".to_string(),
            scheme: "HDX".to_string(),
        }
    }
}

impl From<&AuthOptions> for HdxTokenStrategyOptions {
    fn from(options: &AuthOptions) -> Self {
        Self {
            header: options.header.clone(),
            scheme: options.scheme.clone(),
        }
    }
}

/// `Authorization: HDX <session token>`.
pub struct HdxTokenStrategy {
    tokens: SessionTokens,
    options: HdxTokenStrategyOptions,
}

impl HdxTokenStrategy {
    pub fn new(tokens: SessionTokens) -> Self {
        Self {
            tokens,
            options: HdxTokenStrategyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: HdxTokenStrategyOptions) -> Self {
        self.options = options;
        self
    }

    /// Extract the token from `<scheme> <token>`. The scheme matches
    /// case-insensitively; a missing scheme or empty token yields `None`.
    fn parse_from_headers(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        let (scheme, token) = raw.split_once(' ')?;
        let token = token.trim();
        if token.is_empty() || !scheme.trim().eq_ignore_ascii_case(&self.options.scheme) {
            return None;
        }
        Some(token.to_string())
    }
}

#[async_trait]
impl AuthenticationStrategy for HdxTokenStrategy {
    async fn authenticate(&self, ctx: &ConnectionContext, req: &GatewayRequest) -> HdxResult<Option<Identity>> {
        let Some(raw) = req
            .header(&self.options.header)
            .filter(|v| !v.trim().is_empty())
        else {
            return Ok(None);
        };

        let Some(token) = self.parse_from_headers(raw) else {
            debug!(domain = %ctx.domain, "malformed authorization header");
            return Err(HdxError::token_invalid("malformed authorization header").into_anyhow());
        };

        let identity = self
            .tokens
            .open(&ctx.fingerprint, &ctx.domain, &token, ctx.request_time)?;
        Ok(Some(identity))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use hdx_core::{ErrorKind, Tenant};

    use super::*;
    use crate::token::TokenSecret;

    fn strategy() -> HdxTokenStrategy {
        HdxTokenStrategy::new(SessionTokens::new(
            TokenSecret::new("sk").unwrap(),
            Duration::from_secs(900),
            Duration::from_secs(180),
        ))
    }

    fn ctx(now: i64) -> ConnectionContext {
        ConnectionContext::new("shop", "fp", now, Arc::new(Tenant::default()))
    }

    fn token(strategy: &HdxTokenStrategy, exp: i64) -> String {
        let identity = Identity {
            sub: "42".into(),
            name: "Ana".into(),
            language: "es".into(),
            role: "user".into(),
            exp,
        };
        strategy.tokens.mint("fp", "shop", &identity).unwrap()
    }

    fn kind(err: anyhow::Error) -> ErrorKind {
        HdxError::from_anyhow(&err).map(|e| e.kind).unwrap()
    }

    #[test]
    fn parses_scheme_case_insensitively() {
        let s = strategy();
        assert_eq!(s.parse_from_headers("HDX abc").as_deref(), Some("abc"));
        assert_eq!(s.parse_from_headers("hdx  abc ").as_deref(), Some("abc"));
        assert_eq!(s.parse_from_headers("Bearer abc"), None);
        assert_eq!(s.parse_from_headers("HDX "), None);
        assert_eq!(s.parse_from_headers("abc"), None);
    }

    #[tokio::test]
    async fn absent_header_is_anonymous() {
        let s = strategy();
        let req = GatewayRequest::new("GET", "shop.example.com", "/api/users");
        assert_eq!(s.authenticate(&ctx(1000), &req).await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_header_is_anonymous() {
        let s = strategy();
        for value in ["", "   "] {
            let req = GatewayRequest::new("GET", "shop.example.com", "/api/users").with_header("Authorization", value);
            assert_eq!(s.authenticate(&ctx(1000), &req).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn valid_and_expired_sessions() {
        let s = strategy();
        let req = GatewayRequest::new("GET", "shop.example.com", "/api/users")
            .with_header("Authorization", format!("HDX {}", token(&s, 1900)));

        let identity = s.authenticate(&ctx(1000), &req).await.unwrap().unwrap();
        assert_eq!(identity.sub, "42");

        let err = s.authenticate(&ctx(1901), &req).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::TokenExpired);
    }

    #[tokio::test]
    async fn malformed_header_is_invalid() {
        let s = strategy();
        let req = GatewayRequest::new("GET", "shop.example.com", "/api/users")
            .with_header("Authorization", token(&s, 1900));

        let err = s.authenticate(&ctx(1000), &req).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::TokenInvalid);
    }
}
