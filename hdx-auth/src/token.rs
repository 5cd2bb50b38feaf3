//! Compact HMAC tokens.
//!
//! Format: `fingerprint "." b64(message) "." b64(hmac)` where `b64` is
//! URL-safe base64 without padding and `hmac` is HMAC-SHA256 keyed by the
//! secret over `fingerprint ‖ domain ‖ message`. The domain is bound by the
//! signature but not carried in the token.

use std::fmt;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A signing key. Keeps the keyed HMAC state so every token starts from a
/// clone instead of re-deriving the key.
#[derive(Clone)]
pub struct TokenSecret {
    keyed: HmacSha256,
}

impl TokenSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(anyhow!("token secret cannot be empty"));
        }
        let keyed = HmacSha256::new_from_slice(secret).map_err(|e| anyhow!("invalid token secret: {e}"))?;
        Ok(Self { keyed })
    }

    fn signer(&self, fingerprint: &str, domain: &str, message: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(fingerprint.as_bytes());
        mac.update(domain.as_bytes());
        mac.update(message);
        mac
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret(..)")
    }
}

/// Sign `message` for a fingerprint/domain pair.
pub fn mint(fingerprint: &str, domain: &str, message: &str, secret: &TokenSecret) -> String {
    let signature = secret
        .signer(fingerprint, domain, message.as_bytes())
        .finalize()
        .into_bytes();

    format!(
        "{fingerprint}.{}.{}",
        URL_SAFE_NO_PAD.encode(message),
        URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Recover the message of a token minted for this fingerprint/domain/secret.
///
/// Returns `None` for empty or malformed tokens, tokens bound to another
/// fingerprint, undecodable payloads, and signature mismatches. The payload
/// must be in canonical encoding, so an accepted token is byte-identical to
/// what [`mint`] would produce. The signature check is constant-time.
pub fn verify(fingerprint: &str, domain: &str, token: &str, secret: &TokenSecret) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    let mut parts = token.split('.');
    let (Some(bound_to), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    if bound_to != fingerprint {
        return None;
    }

    let message = String::from_utf8(URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
    if URL_SAFE_NO_PAD.encode(&message) != payload {
        return None;
    }

    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    secret
        .signer(fingerprint, domain, message.as_bytes())
        .verify_slice(&signature)
        .ok()?;

    Some(message)
}
