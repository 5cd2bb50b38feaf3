//! # Errors
//!
//! HDX carries one structured error type through every layer:
//! - consistent status codes + wire error codes (`invalid_token`, ...)
//! - can be carried through anyhow::Error (modules return `anyhow::Result`)
//! - transport-agnostic (the pipeline decides how to render it)
//!
//! Validation failures are resolved into an `HdxError` close to where they
//! happen. Anything that is not an `HdxError` is treated as an internal fault
//! and rendered as a 500 without its details.

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::{Map, Value};

/// A convenience result type for HDX core APIs.
pub type HdxResult<T> = std::result::Result<T, AnyError>;

/// Error classes the gateway knows how to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TenantNotFound,     // 404
    ResourceNotFound,   // 404
    TokenInvalid,       // 401
    TokenExpired,       // 401
    VerifierPremature,  // 429
    CredentialInvalid,  // 401
    MethodNotSupported, // 405
    StorageUnavailable, // 500
    Internal,           // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::TenantNotFound => 404,
            ErrorKind::ResourceNotFound => 404,
            ErrorKind::TokenInvalid => 401,
            ErrorKind::TokenExpired => 401,
            ErrorKind::VerifierPremature => 429,
            ErrorKind::CredentialInvalid => 401,
            ErrorKind::MethodNotSupported => 405,
            ErrorKind::StorageUnavailable => 500,
            ErrorKind::Internal => 500,
        }
    }

    /// Wire value of the `error` field.
    ///
    /// Expired and forged tokens share `invalid_token`, and unknown users share
    /// `invalid_grant` with wrong passwords, so callers cannot tell them apart.
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::TenantNotFound => "not_found",
            ErrorKind::ResourceNotFound => "not_found",
            ErrorKind::TokenInvalid => "invalid_token",
            ErrorKind::TokenExpired => "invalid_token",
            ErrorKind::VerifierPremature => "invalid_request",
            ErrorKind::CredentialInvalid => "invalid_grant",
            ErrorKind::MethodNotSupported => "method_not_allowed",
            ErrorKind::StorageUnavailable => "server_error",
            ErrorKind::Internal => "server_error",
        }
    }

    /// Type-style name used in logs (e.g. "TenantNotFound").
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TenantNotFound => "TenantNotFound",
            ErrorKind::ResourceNotFound => "ResourceNotFound",
            ErrorKind::TokenInvalid => "TokenInvalid",
            ErrorKind::TokenExpired => "TokenExpired",
            ErrorKind::VerifierPremature => "VerifierPremature",
            ErrorKind::CredentialInvalid => "CredentialInvalid",
            ErrorKind::MethodNotSupported => "MethodNotSupported",
            ErrorKind::StorageUnavailable => "StorageUnavailable",
            ErrorKind::Internal => "Internal",
        }
    }

    pub fn is_server_fault(&self) -> bool {
        self.status_code() >= 500
    }
}

/// A structured HDX error that can live inside `anyhow::Error`.
///
/// - kind (status + wire code)
/// - message (for logs; never sent for server faults)
/// - data (extra top-level fields merged into the JSON body, e.g. `delay`)
/// - source (dropped before reaching the client)
#[derive(Debug)]
pub struct HdxError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Map<String, Value>>,
    pub source: Option<AnyError>,
}

impl HdxError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    /// Attach an extra field to the client payload.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }

    /// Convert into `anyhow::Error` so it flows through module results.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to an `HdxError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&HdxError> {
        err.chain().find_map(|e| e.downcast_ref::<HdxError>())
    }

    /// Turn any error into an HdxError:
    /// - if it's already an HdxError, keep it (lossless)
    /// - otherwise wrap as Internal
    pub fn normalize(err: AnyError) -> HdxError {
        match err.downcast::<HdxError>() {
            Ok(hdx) => hdx,
            Err(other) => HdxError::new(ErrorKind::Internal, other.to_string()).with_source(other),
        }
    }

    /// A copy suitable for returning to clients: drops the source, and for
    /// server faults also the data, which may carry internal details.
    pub fn sanitize_for_client(&self) -> HdxError {
        HdxError {
            kind: self.kind,
            message: self.message.clone(),
            data: if self.kind.is_server_fault() {
                None
            } else {
                self.data.clone()
            },
            source: None,
        }
    }

    /// Client payload: `{"error": <code>, ...data}`.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "error".to_string(),
            Value::String(self.error_code().to_string()),
        );
        if let Some(data) = &self.data {
            for (k, v) in data {
                body.insert(k.clone(), v.clone());
            }
        }
        Value::Object(body)
    }

    // ---- Constructors ----

    pub fn tenant_not_found(domain: impl fmt::Display) -> Self {
        Self::new(ErrorKind::TenantNotFound, format!("tenant not registered: {domain}"))
    }
    pub fn resource_not_found(name: impl fmt::Display) -> Self {
        Self::new(ErrorKind::ResourceNotFound, format!("unknown resource: {name}"))
    }
    pub fn token_invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenInvalid, msg)
    }
    pub fn token_expired(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, msg)
    }
    pub fn verifier_premature(delay: i64) -> Self {
        Self::new(ErrorKind::VerifierPremature, format!("verifier issued {delay}s in the future"))
            .with_field("delay", delay)
    }
    pub fn credential_invalid() -> Self {
        Self::new(ErrorKind::CredentialInvalid, "invalid credentials")
    }
    pub fn method_not_supported(method: impl fmt::Display) -> Self {
        Self::new(ErrorKind::MethodNotSupported, format!("method not allowed: {method}"))
    }
    pub fn storage_unavailable(source: AnyError) -> Self {
        Self::new(ErrorKind::StorageUnavailable, source.to_string()).with_source(source)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

impl fmt::Display for HdxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.name(), self.code(), self.message)
    }
}

impl std::error::Error for HdxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience helper for "bail with HdxError".
#[macro_export]
macro_rules! bail_hdx {
    ($ctor:ident) => {
        return Err($crate::errors::HdxError::$ctor().into_anyhow());
    };
    ($ctor:ident, $($arg:expr),+) => {
        return Err($crate::errors::HdxError::$ctor($($arg),+).into_anyhow());
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premature_verifier_carries_delay() {
        let err = HdxError::verifier_premature(3).with_field("verifier", "abc");
        assert_eq!(err.code(), 429);
        let body = err.to_json();
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["delay"], 3);
        assert_eq!(body["verifier"], "abc");
    }

    #[test]
    fn normalize_wraps_foreign_errors_as_internal() {
        let err = HdxError::normalize(anyhow::anyhow!("socket closed"));
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(err.source.is_some());
        assert_eq!(err.sanitize_for_client().to_json()["error"], "server_error");
    }

    #[test]
    fn normalize_keeps_hdx_errors() {
        let err = HdxError::normalize(HdxError::credential_invalid().into_anyhow());
        assert_eq!(err.kind, ErrorKind::CredentialInvalid);
        assert_eq!(err.to_json()["error"], "invalid_grant");
    }

    #[test]
    fn server_faults_lose_their_data_when_sanitized() {
        let err = HdxError::internal("boom").with_field("query", "SELECT 1");
        let safe = err.sanitize_for_client();
        assert!(safe.data.is_none());
        assert_eq!(safe.to_json(), serde_json::json!({"error": "server_error"}));
    }

    #[test]
    fn found_through_context_layers() {
        let err = anyhow::Error::from(HdxError::token_expired("exp passed")).context("users.get");
        let found = HdxError::from_anyhow(&err).map(|e| e.kind);
        assert_eq!(found, Some(ErrorKind::TokenExpired));
    }

    #[test]
    fn bail_hdx_returns_early() {
        fn guarded(ok: bool) -> crate::HdxResult<u8> {
            if !ok {
                crate::bail_hdx!(token_invalid, "no session");
            }
            Ok(1)
        }

        assert_eq!(guarded(true).unwrap(), 1);
        let err = guarded(false).unwrap_err();
        let hdx = HdxError::from_anyhow(&err).unwrap();
        assert_eq!(hdx.kind, ErrorKind::TokenInvalid);
        assert_eq!(hdx.message, "no session");
    }
}
