use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tenant::Tenant;

/// Identity carried inside a session token.
///
/// The server keeps no copy; whatever a valid token says is the identity for
/// the lifetime of that token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub sub: String,
    pub name: String,
    #[serde(rename = "userLanguage")]
    pub language: String,
    pub role: String,
    pub exp: i64,
}

impl Identity {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }

    /// Seconds of validity left at `now` (negative once expired).
    pub fn remaining(&self, now: i64) -> i64 {
        self.exp - now
    }
}

/// Status and body accumulated while a request is handled.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBuffer {
    pub status: u16,
    pub body: Option<Value>,
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }
}

impl ResponseBuffer {
    pub fn set(&mut self, status: u16, body: Option<Value>) {
        self.status = status;
        self.body = body;
    }
}

/// Per-request state owned by the pipeline.
///
/// Built at request entry, handed to exactly one module, and turned into the
/// response envelope at exit.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub domain: String,
    pub fingerprint: String,
    pub request_time: i64,
    pub resource: String,
    pub sub_path: Option<String>,
    pub tenant: Arc<Tenant>,
    pub identity: Option<Identity>,
    pub response: ResponseBuffer,
}

impl ConnectionContext {
    pub fn new(
        domain: impl Into<String>,
        fingerprint: impl Into<String>,
        request_time: i64,
        tenant: Arc<Tenant>,
    ) -> Self {
        Self {
            domain: domain.into(),
            fingerprint: fingerprint.into(),
            request_time,
            resource: String::new(),
            sub_path: None,
            tenant,
            identity: None,
            response: ResponseBuffer::default(),
        }
    }

    pub fn with_route(mut self, resource: impl Into<String>, sub_path: Option<String>) -> Self {
        self.resource = resource.into();
        self.sub_path = sub_path;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}
