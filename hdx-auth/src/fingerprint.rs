//! Per-connection fingerprint.
//!
//! `b64url(sha256(origin ‖ client ‖ domain))`, 43 characters. It ties a token
//! to the network origin and client that received it. It is not a user id:
//! many users behind one proxy with the same browser share a fingerprint.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hdx_core::GatewayRequest;
use sha2::{Digest, Sha256};

/// Header the upstream proxy fills with the client address.
pub const DEFAULT_ORIGIN_HEADER: &str = "RemoteAddr";

pub fn fingerprint(origin: &str, client: &str, domain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(origin.as_bytes());
    hasher.update(client.as_bytes());
    hasher.update(domain.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Fingerprint of an inbound request.
///
/// The origin comes from `origin_header`, falling back to the socket peer
/// address; the client string is the `User-Agent`. Missing values count as
/// empty strings.
pub fn fingerprint_request(req: &GatewayRequest, origin_header: &str, domain: &str) -> String {
    let origin = req
        .header(origin_header)
        .or(req.peer.as_deref())
        .unwrap_or_default();
    let client = req.header("user-agent").unwrap_or_default();
    fingerprint(origin, client, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_and_url_safe() {
        let a = fingerprint("10.0.0.1", "Mozilla/5.0", "shop");
        let b = fingerprint("10.0.0.1", "Mozilla/5.0", "shop");

        assert_eq!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_'));
    }

    #[test]
    fn every_input_matters() {
        let base = fingerprint("10.0.0.1", "curl", "shop");
        assert_ne!(base, fingerprint("10.0.0.2", "curl", "shop"));
        assert_ne!(base, fingerprint("10.0.0.1", "wget", "shop"));
        assert_ne!(base, fingerprint("10.0.0.1", "curl", "mall"));
    }

    #[test]
    fn origin_header_wins_over_peer() {
        let req = GatewayRequest::new("GET", "shop.example.com", "/api/init")
            .with_header("RemoteAddr", "203.0.113.9")
            .with_header("User-Agent", "curl")
            .with_peer("127.0.0.1");

        assert_eq!(
            fingerprint_request(&req, DEFAULT_ORIGIN_HEADER, "shop"),
            fingerprint("203.0.113.9", "curl", "shop")
        );

        let direct = GatewayRequest::new("GET", "shop.example.com", "/api/init")
            .with_header("User-Agent", "curl")
            .with_peer("127.0.0.1");
        assert_eq!(
            fingerprint_request(&direct, DEFAULT_ORIGIN_HEADER, "shop"),
            fingerprint("127.0.0.1", "curl", "shop")
        );
    }
}
