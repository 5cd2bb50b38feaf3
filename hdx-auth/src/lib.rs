//! hdx-auth: connection-bound tokens for the HDX gateway.
//!
//! Tokens are signed with HMAC-SHA256 and tied to the connection
//! fingerprint and tenant domain. Two secrets keep verifiers and sessions in
//! separate namespaces.

pub mod fingerprint;
pub mod options;
pub mod password;
pub mod session;
pub mod strategy;
pub mod token;
pub mod verifier;

pub use fingerprint::{fingerprint, fingerprint_request, DEFAULT_ORIGIN_HEADER};
pub use options::{AuthOptions, AuthOptionsBuilder};
pub use password::{BcryptVerifier, PasswordVerifier};
pub use session::{
    IdentityLookup, IdentityStore, LoginGrant, LoginRequest, LoginStage, SessionIssuer, SessionTokens,
    StoredIdentity,
};
pub use strategy::{AuthenticationStrategy, HdxTokenStrategy, HdxTokenStrategyOptions};
pub use token::TokenSecret;
pub use verifier::{VerifierCheck, VerifierHandshake};
