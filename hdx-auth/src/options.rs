// Authentication options and configuration.

use std::time::Duration;

use hdx_core::HdxConfigSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys read from the `auth.` section of the configuration.
const SNAPSHOT_FIELDS: [&str; 7] = [
    "session_secret",
    "verifier_secret",
    "verifier_ttl",
    "session_ttl",
    "session_renew",
    "scheme",
    "header",
];

/// Main authentication configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthOptions {
    /// Secret for long-lived session tokens
    pub session_secret: Option<String>,
    /// Secret for short-lived login verifiers
    pub verifier_secret: Option<String>,
    /// How long a verifier stays usable after issue
    #[serde(with = "humantime_serde")]
    pub verifier_ttl: Duration,
    /// Session lifetime
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
    /// Window before expiry in which a session may be renewed
    #[serde(with = "humantime_serde")]
    pub session_renew: Duration,
    /// Authorization scheme, matched case-insensitively
    pub scheme: String,
    /// Header carrying the session token
    pub header: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            session_secret: None,
            verifier_secret: None,
            verifier_ttl: Duration::from_secs(120),   // 2 minutes
            session_ttl: Duration::from_secs(900),    // 15 minutes
            session_renew: Duration::from_secs(180),  // 3 minutes
            scheme: "HDX".to_string(),
            header: "authorization".to_string(),
        }
    }
}

impl AuthOptions {
    /// Build options from the `auth.*` keys of a config snapshot, keeping
    /// defaults for missing keys. Durations use humantime syntax (`2m`, `900s`).
    pub fn from_snapshot(snapshot: &HdxConfigSnapshot) -> Result<Self, String> {
        let mut value = serde_json::to_value(Self::default()).map_err(|e| e.to_string())?;

        for field in SNAPSHOT_FIELDS {
            if let Some(raw) = snapshot.get(&format!("auth.{field}")) {
                value[field] = Value::String(raw.trim().to_string());
            }
        }

        serde_json::from_value(value).map_err(|e| format!("invalid auth configuration: {e}"))
    }

    /// Validate the entire authentication configuration
    pub fn validate(&self) -> Result<(), String> {
        let session = self.session_secret.as_deref().unwrap_or_default();
        let verifier = self.verifier_secret.as_deref().unwrap_or_default();

        if session.is_empty() {
            return Err("auth.session_secret must be set".to_string());
        }
        if verifier.is_empty() {
            return Err("auth.verifier_secret must be set".to_string());
        }
        if session == verifier {
            return Err("session and verifier secrets must differ".to_string());
        }

        if self.verifier_ttl.as_secs() == 0 {
            return Err("Verifier TTL must be greater than 0".to_string());
        }
        if self.session_ttl.as_secs() == 0 {
            return Err("Session TTL must be greater than 0".to_string());
        }
        if self.session_renew > self.session_ttl {
            return Err("Session renew window cannot exceed the session TTL".to_string());
        }

        if self.scheme.trim().is_empty() || self.scheme.contains(' ') {
            return Err("Authorization scheme must be a single non-empty word".to_string());
        }
        if self.header.trim().is_empty() {
            return Err("Authorization header name cannot be empty".to_string());
        }

        Ok(())
    }

    /// Create a new AuthOptions builder
    pub fn builder() -> AuthOptionsBuilder {
        AuthOptionsBuilder::new()
    }
}

/// Builder pattern for AuthOptions configuration
#[derive(Clone, Debug, Default)]
pub struct AuthOptionsBuilder {
    options: AuthOptions,
}

impl AuthOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secrets(mut self, session: impl Into<String>, verifier: impl Into<String>) -> Self {
        self.options.session_secret = Some(session.into());
        self.options.verifier_secret = Some(verifier.into());
        self
    }

    pub fn verifier_ttl(mut self, ttl: Duration) -> Self {
        self.options.verifier_ttl = ttl;
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.options.session_ttl = ttl;
        self
    }

    pub fn session_renew(mut self, window: Duration) -> Self {
        self.options.session_renew = window;
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.options.scheme = scheme.into();
        self
    }

    pub fn build(self) -> AuthOptions {
        self.options
    }

    /// Build and validate the AuthOptions configuration
    pub fn build_validated(self) -> Result<AuthOptions, String> {
        let options = self.build();
        options.validate()?;
        Ok(options)
    }
}
