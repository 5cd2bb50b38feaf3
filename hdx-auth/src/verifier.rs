//! Login verifier handshake.
//!
//! A verifier is a token whose message is its issue time. `GET /init` hands
//! one out; `POST /sessions` only accepts credentials next to a verifier that
//! is at most `ttl` seconds old. No server state is kept.

use std::time::Duration;

use anyhow::{anyhow, Result};
use hdx_core::{HdxError, HdxResult};
use tracing::debug;

use crate::options::AuthOptions;
use crate::token::{self, TokenSecret};

/// Outcome of checking a presented verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierCheck {
    Accepted { issued_at: i64 },
    /// Issued in the future; retry after `delay` seconds.
    TooEarly { delay: i64 },
    /// Stale, forged, or bound to another connection.
    Expired,
}

impl VerifierCheck {
    /// `Accepted` becomes the issue time, everything else an `HdxError`.
    pub fn into_result(self) -> HdxResult<i64> {
        match self {
            VerifierCheck::Accepted { issued_at } => Ok(issued_at),
            VerifierCheck::TooEarly { delay } => Err(HdxError::verifier_premature(delay).into_anyhow()),
            VerifierCheck::Expired => Err(HdxError::token_expired("verifier invalid or expired").into_anyhow()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifierHandshake {
    secret: TokenSecret,
    ttl: i64,
}

impl VerifierHandshake {
    pub fn new(secret: TokenSecret, ttl: Duration) -> Self {
        Self {
            secret,
            ttl: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    pub fn from_options(options: &AuthOptions) -> Result<Self> {
        let secret = options
            .verifier_secret
            .as_deref()
            .ok_or_else(|| anyhow!("auth.verifier_secret is not configured"))?;
        Ok(Self::new(TokenSecret::new(secret)?, options.verifier_ttl))
    }

    pub fn issue(&self, fingerprint: &str, domain: &str, now: i64) -> String {
        token::mint(fingerprint, domain, &now.to_string(), &self.secret)
    }

    pub fn check(&self, fingerprint: &str, domain: &str, presented: &str, now: i64) -> VerifierCheck {
        let Some(message) = token::verify(fingerprint, domain, presented, &self.secret) else {
            debug!(domain, "verifier rejected by signature check");
            return VerifierCheck::Expired;
        };

        let Ok(issued_at) = message.parse::<i64>() else {
            debug!(domain, "verifier payload is not a timestamp");
            return VerifierCheck::Expired;
        };

        if issued_at > now {
            return VerifierCheck::TooEarly { delay: issued_at - now };
        }
        if now >= issued_at.saturating_add(self.ttl) {
            return VerifierCheck::Expired;
        }

        VerifierCheck::Accepted { issued_at }
    }
}
