//! Response envelope.
//!
//! Every answer is JSON with caching disabled. Bodies are prefixed with the
//! `)]}'\n` guard so a response cannot be evaluated as a script. 204 and 404
//! go out with no body at all.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use hdx_core::ResponseBuffer;
use serde_json::Value;

pub const GUARD: &str = ")]}'\n";
pub const CONTENT_TYPE: &str = "application/json;charset=UTF-8";
pub const CACHE_CONTROL: &str = "no-cache, no-store";

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: u16,
    pub body: Option<Value>,
}

impl Envelope {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn not_found() -> Self {
        Self::new(404, None)
    }

    pub fn carries_body(&self) -> bool {
        !matches!(self.status, 204 | 404)
    }

    /// Wire body: empty for 204/404, otherwise the guard followed by the
    /// JSON payload (the guard alone when there is no payload).
    pub fn render_body(&self) -> String {
        if !self.carries_body() {
            return String::new();
        }
        match &self.body {
            Some(payload) => format!("{GUARD}{payload}"),
            None => GUARD.to_string(),
        }
    }
}

impl From<ResponseBuffer> for Envelope {
    fn from(buffer: ResponseBuffer) -> Self {
        Self::new(buffer.status, buffer.body)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut res = Response::new(Body::from(self.render_body()));
        *res.status_mut() = status;

        let headers = res.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
        res
    }
}
