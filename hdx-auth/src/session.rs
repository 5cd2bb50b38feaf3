//! Session issuing.
//!
//! Login walks `AwaitingVerifier -> CredentialsSubmitted -> Validated ->
//! SessionIssued`; any step may end in `Rejected`. The session token carries
//! the whole [`Identity`] as JSON, so nothing is stored server-side.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hdx_core::{
    ConnectionContext, ErrorKind, GatewayRequest, HdxError, HdxResult, Identity, StoreResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::options::AuthOptions;
use crate::password::PasswordVerifier;
use crate::token::{self, TokenSecret};
use crate::verifier::VerifierHandshake;

fn secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Mints and opens session tokens.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    secret: TokenSecret,
    ttl: i64,
    renew_window: i64,
}

impl SessionTokens {
    pub fn new(secret: TokenSecret, ttl: Duration, renew_window: Duration) -> Self {
        Self {
            secret,
            ttl: secs(ttl),
            renew_window: secs(renew_window),
        }
    }

    pub fn from_options(options: &AuthOptions) -> Result<Self> {
        let secret = options
            .session_secret
            .as_deref()
            .ok_or_else(|| anyhow!("auth.session_secret is not configured"))?;
        Ok(Self::new(
            TokenSecret::new(secret)?,
            options.session_ttl,
            options.session_renew,
        ))
    }

    pub fn mint(&self, fingerprint: &str, domain: &str, identity: &Identity) -> Result<String> {
        let message = serde_json::to_string(identity)?;
        Ok(token::mint(fingerprint, domain, &message, &self.secret))
    }

    /// Verify a presented session token and decode its identity.
    ///
    /// Bad signatures and undecodable payloads are `TokenInvalid`; a token
    /// past its `exp` is `TokenExpired`. Both answer `invalid_token`.
    pub fn open(&self, fingerprint: &str, domain: &str, presented: &str, now: i64) -> HdxResult<Identity> {
        let message = token::verify(fingerprint, domain, presented, &self.secret)
            .ok_or_else(|| HdxError::token_invalid("session token rejected").into_anyhow())?;

        let identity: Identity = serde_json::from_str(&message).map_err(|e| {
            HdxError::token_invalid("session payload is not an identity")
                .with_source(e.into())
                .into_anyhow()
        })?;

        if identity.is_expired_at(now) {
            return Err(HdxError::token_expired(format!("session expired at {}", identity.exp)).into_anyhow());
        }

        Ok(identity)
    }
}

/// A user record as kept by the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub language: String,
    pub role: String,
    #[serde(default)]
    pub deleted: bool,
}

impl StoredIdentity {
    pub fn to_identity(&self, exp: i64) -> Identity {
        Identity {
            sub: self.id.clone(),
            name: self.name.clone(),
            language: self.language.clone(),
            role: self.role.clone(),
            exp,
        }
    }
}

/// How a login names its user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityLookup {
    Username(String),
    Subject(String),
}

impl IdentityLookup {
    /// Username wins when both are supplied.
    pub fn from_credentials(username: Option<&str>, sub: Option<&str>) -> Option<Self> {
        match (username, sub) {
            (Some(username), _) => Some(Self::Username(username.to_string())),
            (None, Some(sub)) => Some(Self::Subject(sub.to_string())),
            (None, None) => None,
        }
    }
}

impl fmt::Display for IdentityLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityLookup::Username(u) => write!(f, "username={u}"),
            IdentityLookup::Subject(s) => write!(f, "sub={s}"),
        }
    }
}

/// User lookup. Implementations never return deleted records.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find(&self, lookup: &IdentityLookup) -> StoreResult<Option<StoredIdentity>>;
}

/// Credentials submitted to `POST /sessions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub sub: Option<String>,
    pub password: String,
    pub verifier: Option<String>,
}

impl LoginRequest {
    /// Form fields `username`, `sub`, `password` and the `Verifier` header.
    pub fn from_gateway(req: &GatewayRequest) -> Self {
        Self {
            username: req.form_value("username").map(str::to_string),
            sub: req.form_value("sub").map(str::to_string),
            password: req.form_value("password").unwrap_or_default().to_string(),
            verifier: req.header("verifier").map(str::to_string),
        }
    }
}

/// Successful login or renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginGrant {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub verifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    AwaitingVerifier,
    CredentialsSubmitted,
    Validated,
    SessionIssued,
    Rejected,
}

impl LoginStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStage::AwaitingVerifier => "awaiting_verifier",
            LoginStage::CredentialsSubmitted => "credentials_submitted",
            LoginStage::Validated => "validated",
            LoginStage::SessionIssued => "session_issued",
            LoginStage::Rejected => "rejected",
        }
    }
}

pub struct SessionIssuer {
    verifiers: VerifierHandshake,
    tokens: SessionTokens,
    store: Arc<dyn IdentityStore>,
    passwords: Arc<dyn PasswordVerifier>,
}

impl SessionIssuer {
    pub fn new(
        verifiers: VerifierHandshake,
        tokens: SessionTokens,
        store: Arc<dyn IdentityStore>,
        passwords: Arc<dyn PasswordVerifier>,
    ) -> Self {
        Self {
            verifiers,
            tokens,
            store,
            passwords,
        }
    }

    pub fn verifiers(&self) -> &VerifierHandshake {
        &self.verifiers
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    /// Run the login handshake for one connection.
    ///
    /// Client-facing failures carry a freshly minted `verifier` so the caller
    /// can retry without another round trip to `/init`.
    pub async fn login(&self, ctx: &ConnectionContext, login: &LoginRequest) -> Result<LoginGrant> {
        let fresh = || self.verifiers.issue(&ctx.fingerprint, &ctx.domain, ctx.request_time);

        match self.try_login(ctx, login).await {
            Ok(access_token) => {
                info!(domain = %ctx.domain, stage = LoginStage::SessionIssued.as_str(), "session issued");
                Ok(LoginGrant {
                    access_token,
                    verifier: fresh(),
                })
            }
            Err(err) => {
                let err = HdxError::normalize(err);
                debug!(
                    domain = %ctx.domain,
                    stage = LoginStage::Rejected.as_str(),
                    kind = err.kind.name(),
                    "login rejected"
                );
                if err.kind.is_server_fault() {
                    return Err(err.into_anyhow());
                }
                Err(err.with_field("verifier", fresh()).into_anyhow())
            }
        }
    }

    async fn try_login(&self, ctx: &ConnectionContext, login: &LoginRequest) -> Result<String> {
        let now = ctx.request_time;

        debug!(domain = %ctx.domain, stage = LoginStage::AwaitingVerifier.as_str());
        let presented = login.verifier.as_deref().unwrap_or_default();
        self.verifiers
            .check(&ctx.fingerprint, &ctx.domain, presented, now)
            .into_result()?;

        debug!(domain = %ctx.domain, stage = LoginStage::CredentialsSubmitted.as_str());
        let lookup = IdentityLookup::from_credentials(login.username.as_deref(), login.sub.as_deref())
            .ok_or_else(|| HdxError::credential_invalid().into_anyhow())?;

        let record = self
            .store
            .find(&lookup)
            .await
            .map_err(|e| HdxError::storage_unavailable(e.into()).into_anyhow())?
            .filter(|record| !record.deleted)
            .ok_or_else(|| {
                debug!(domain = %ctx.domain, %lookup, "no such identity");
                HdxError::credential_invalid().into_anyhow()
            })?;

        if !self.passwords.verify(&login.password, &record.password_hash).await? {
            debug!(domain = %ctx.domain, %lookup, "password mismatch");
            return Err(HdxError::credential_invalid().into_anyhow());
        }

        debug!(domain = %ctx.domain, sub = %record.id, stage = LoginStage::Validated.as_str());
        let identity = record.to_identity(now.saturating_add(self.tokens.ttl));
        self.tokens.mint(&ctx.fingerprint, &ctx.domain, &identity)
    }

    /// Re-issue the caller's session once it is inside the renew window.
    ///
    /// Earlier calls get `VerifierPremature` with the seconds until the
    /// window opens. The user must still exist in the store.
    pub async fn renew(&self, ctx: &ConnectionContext) -> Result<LoginGrant> {
        let now = ctx.request_time;
        let Some(current) = ctx.identity.as_ref() else {
            return Err(HdxError::token_invalid("renewal requires a session").into_anyhow());
        };

        let wait = current.remaining(now) - self.tokens.renew_window;
        if wait > 0 {
            return Err(HdxError::new(ErrorKind::VerifierPremature, "session not yet renewable")
                .with_field("delay", wait)
                .into_anyhow());
        }

        let record = self
            .store
            .find(&IdentityLookup::Subject(current.sub.clone()))
            .await
            .map_err(|e| HdxError::storage_unavailable(e.into()).into_anyhow())?
            .filter(|record| !record.deleted);

        let Some(record) = record else {
            warn!(domain = %ctx.domain, sub = %current.sub, "renewal for a user that no longer exists");
            return Err(HdxError::token_invalid("session subject is gone").into_anyhow());
        };

        let identity = record.to_identity(now.saturating_add(self.tokens.ttl));
        let access_token = self.tokens.mint(&ctx.fingerprint, &ctx.domain, &identity)?;

        info!(domain = %ctx.domain, sub = %identity.sub, exp = identity.exp, "session renewed");
        Ok(LoginGrant {
            access_token,
            verifier: self.verifiers.issue(&ctx.fingerprint, &ctx.domain, now),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hdx_core::{StoreError, Tenant};

    use super::*;
    use crate::password::BcryptVerifier;

    struct Users {
        records: HashMap<String, StoredIdentity>,
        broken: bool,
    }

    #[async_trait]
    impl IdentityStore for Users {
        async fn find(&self, lookup: &IdentityLookup) -> StoreResult<Option<StoredIdentity>> {
            if self.broken {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            let found = self.records.values().find(|r| match lookup {
                IdentityLookup::Username(u) => &r.username == u,
                IdentityLookup::Subject(s) => &r.id == s,
            });
            Ok(found.filter(|r| !r.deleted).cloned())
        }
    }

    async fn issuer(broken: bool) -> SessionIssuer {
        let passwords = BcryptVerifier::with_cost(4);
        let mut records = HashMap::new();
        for (id, username, deleted) in [("42", "ana", false), ("7", "old", true)] {
            records.insert(
                id.to_string(),
                StoredIdentity {
                    id: id.to_string(),
                    username: username.to_string(),
                    password_hash: passwords.hash("pw").await.unwrap(),
                    name: username.to_uppercase(),
                    language: "es".into(),
                    role: "editor".into(),
                    deleted,
                },
            );
        }

        SessionIssuer::new(
            VerifierHandshake::new(TokenSecret::new("vk").unwrap(), Duration::from_secs(120)),
            SessionTokens::new(TokenSecret::new("sk").unwrap(), Duration::from_secs(900), Duration::from_secs(180)),
            Arc::new(Users { records, broken }),
            Arc::new(passwords),
        )
    }

    fn ctx(now: i64) -> ConnectionContext {
        let tenant = Arc::new(Tenant {
            id: 1,
            country: "ES".into(),
            language: "es".into(),
        });
        ConnectionContext::new("shop", "fp", now, tenant)
    }

    fn login(issuer: &SessionIssuer, issued: i64, username: Option<&str>, sub: Option<&str>, pw: &str) -> LoginRequest {
        LoginRequest {
            username: username.map(str::to_string),
            sub: sub.map(str::to_string),
            password: pw.to_string(),
            verifier: Some(issuer.verifiers().issue("fp", "shop", issued)),
        }
    }

    fn failure(err: anyhow::Error) -> HdxError {
        HdxError::normalize(err)
    }

    #[tokio::test]
    async fn successful_login_issues_identity() {
        let issuer = issuer(false).await;
        let grant = issuer
            .login(&ctx(1000), &login(&issuer, 990, Some("ana"), None, "pw"))
            .await
            .unwrap();

        let identity = issuer.tokens().open("fp", "shop", &grant.access_token, 1000).unwrap();
        assert_eq!(identity.sub, "42");
        assert_eq!(identity.role, "editor");
        assert_eq!(identity.exp, 1900);
        assert_eq!(
            issuer.verifiers().check("fp", "shop", &grant.verifier, 1000),
            crate::verifier::VerifierCheck::Accepted { issued_at: 1000 }
        );

        let json = serde_json::to_value(&grant).unwrap();
        assert!(json.get("accessToken").is_some());
    }

    #[tokio::test]
    async fn username_wins_over_subject() {
        let issuer = issuer(false).await;
        let grant = issuer
            .login(&ctx(1000), &login(&issuer, 1000, Some("ana"), Some("7"), "pw"))
            .await
            .unwrap();
        let identity = issuer.tokens().open("fp", "shop", &grant.access_token, 1000).unwrap();
        assert_eq!(identity.sub, "42");
    }

    #[tokio::test]
    async fn rejected_logins_carry_a_fresh_verifier() {
        let issuer = issuer(false).await;

        for request in [
            login(&issuer, 1000, Some("ana"), None, "wrong"),
            login(&issuer, 1000, Some("nobody"), None, "pw"),
            login(&issuer, 1000, None, Some("7"), "pw"),
            login(&issuer, 1000, None, None, "pw"),
        ] {
            let err = failure(issuer.login(&ctx(1000), &request).await.unwrap_err());
            assert_eq!(err.kind, ErrorKind::CredentialInvalid);
            assert!(err.to_json()["verifier"].is_string());
        }
    }

    #[tokio::test]
    async fn verifier_is_checked_before_credentials() {
        let issuer = issuer(false).await;

        let early = failure(
            issuer
                .login(&ctx(1000), &login(&issuer, 1003, Some("ana"), None, "pw"))
                .await
                .unwrap_err(),
        );
        assert_eq!(early.kind, ErrorKind::VerifierPremature);
        assert_eq!(early.to_json()["delay"], 3);

        let stale = failure(
            issuer
                .login(&ctx(1200), &login(&issuer, 1000, Some("ana"), None, "pw"))
                .await
                .unwrap_err(),
        );
        assert_eq!(stale.kind, ErrorKind::TokenExpired);
        assert!(stale.to_json()["verifier"].is_string());
    }

    #[tokio::test]
    async fn storage_faults_escalate() {
        let issuer = issuer(true).await;
        let err = failure(
            issuer
                .login(&ctx(1000), &login(&issuer, 1000, Some("ana"), None, "pw"))
                .await
                .unwrap_err(),
        );
        assert_eq!(err.kind, ErrorKind::StorageUnavailable);
        assert!(err.data.is_none());
    }

    #[tokio::test]
    async fn expired_and_forged_sessions() {
        let issuer = issuer(false).await;
        let identity = Identity {
            sub: "42".into(),
            name: "ANA".into(),
            language: "es".into(),
            role: "editor".into(),
            exp: 1900,
        };
        let token = issuer.tokens().mint("fp", "shop", &identity).unwrap();

        assert!(issuer.tokens().open("fp", "shop", &token, 1900).is_ok());
        let expired = failure(issuer.tokens().open("fp", "shop", &token, 1901).unwrap_err());
        assert_eq!(expired.kind, ErrorKind::TokenExpired);
        let foreign = failure(issuer.tokens().open("other", "shop", &token, 1000).unwrap_err());
        assert_eq!(foreign.kind, ErrorKind::TokenInvalid);
    }

    #[tokio::test]
    async fn renew_only_inside_window() {
        let issuer = issuer(false).await;
        let mut ctx = ctx(1000);
        ctx.identity = Some(Identity {
            sub: "42".into(),
            name: "ANA".into(),
            language: "es".into(),
            role: "editor".into(),
            exp: 1900,
        });

        let early = failure(issuer.renew(&ctx).await.unwrap_err());
        assert_eq!(early.kind, ErrorKind::VerifierPremature);
        assert_eq!(early.to_json()["delay"], 720);

        ctx.request_time = 1720;
        let grant = issuer.renew(&ctx).await.unwrap();
        let renewed = issuer.tokens().open("fp", "shop", &grant.access_token, 1720).unwrap();
        assert_eq!(renewed.exp, 2620);

        ctx.identity = None;
        let anonymous = failure(issuer.renew(&ctx).await.unwrap_err());
        assert_eq!(anonymous.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn login_request_reads_form_and_verifier_header() {
        let req = GatewayRequest::new("POST", "shop.example.com", "/api/sessions")
            .with_form_field("username", "ana")
            .with_form_field("sub", "")
            .with_form_field("password", "pw")
            .with_header("Verifier", "fp.ts.sig");

        let login = LoginRequest::from_gateway(&req);
        assert_eq!(login.username.as_deref(), Some("ana"));
        assert_eq!(login.sub, None);
        assert_eq!(login.password, "pw");
        assert_eq!(login.verifier.as_deref(), Some("fp.ts.sig"));

        let empty = LoginRequest::from_gateway(&GatewayRequest::new("POST", "shop.example.com", "/api/sessions"));
        assert_eq!(empty, LoginRequest::default());
    }
}
