//! Storage contract shared by the tenant resolver and the session issuer.
//!
//! Every lookup returns at most one record; `Ok(None)` is a miss, `Err` is a
//! backend fault that must degrade only the request that hit it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
