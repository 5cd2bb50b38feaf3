//! hdx-axum: Axum front end for the HDX gateway.
//!
//! A single fallback route feeds every request into the [`Gateway`]
//! pipeline, which renders the JSON [`Envelope`].

pub mod app;
pub mod envelope;
pub mod gateway;
pub mod request;
pub mod state;
mod error;
pub use error::HdxAxumError;
pub use state::{GatewaySettings, HdxAxumState};

pub use app::{axum, AxumApp};
pub use envelope::Envelope;
pub use gateway::Gateway;
