use axum::response::{IntoResponse, Response};
use hdx_core::errors::HdxError;
use tracing::{debug, error};

use crate::envelope::Envelope;

#[derive(Debug)]
pub struct HdxAxumError(pub anyhow::Error);

impl From<anyhow::Error> for HdxAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl HdxAxumError {
    /// Render into the client envelope. Anything that is not an `HdxError`
    /// (even behind anyhow contexts) becomes a 500 `server_error`; server
    /// faults are logged with their full chain and sent without details.
    pub fn into_envelope(self) -> Envelope {
        let err = match HdxError::from_anyhow(&self.0) {
            Some(hdx) => {
                if hdx.kind.is_server_fault() {
                    error!(kind = hdx.kind.name(), error = ?self.0, "request failed");
                }
                hdx.sanitize_for_client()
            }
            None => {
                error!(error = ?self.0, "unhandled error");
                HdxError::normalize(self.0).sanitize_for_client()
            }
        };

        if !err.kind.is_server_fault() {
            debug!(kind = err.kind.name(), status = err.code(), message = %err.message, "request rejected");
        }

        Envelope::new(err.code(), Some(err.to_json()))
    }
}

impl IntoResponse for HdxAxumError {
    fn into_response(self) -> Response {
        self.into_envelope().into_response()
    }
}
