// Password verification.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bcrypt::{hash, verify};
use tracing::warn;

/// Opaque credential check used by the session issuer.
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    /// `Ok(false)` on mismatch. Implementations must compare in constant time.
    async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool>;

    async fn hash(&self, password: &str) -> Result<String>;
}

/// bcrypt on the blocking pool, so hashing never stalls the request workers.
#[derive(Clone, Debug)]
pub struct BcryptVerifier {
    cost: u32,
}

impl Default for BcryptVerifier {
    fn default() -> Self {
        Self { cost: 10 }
    }
}

impl BcryptVerifier {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl PasswordVerifier for BcryptVerifier {
    async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        let outcome = tokio::task::spawn_blocking(move || verify(password, &stored_hash))
            .await
            .map_err(|e| anyhow!("password verification task failed: {e}"))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                // A malformed stored hash can never match; treat it as a mismatch.
                warn!(error = %e, "bcrypt verify failed");
                Ok(false)
            }
        }
    }

    async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| anyhow!("password hashing task failed: {e}"))?
            .map_err(|e| anyhow!(e.to_string()))
    }
}
