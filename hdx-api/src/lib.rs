pub mod config;
pub mod modules;
pub mod store;

use std::sync::Arc;

use anyhow::Result;
use hdx_auth::{BcryptVerifier, HdxTokenStrategy, SessionIssuer, SessionTokens, VerifierHandshake};
use hdx_axum::{axum, AxumApp, Gateway};
use hdx_core::{Clock, SystemClock, TenantResolver};

use crate::config::Settings;
use crate::store::MemoryStore;

/// Load the seed named in `settings` and build the server.
pub async fn build(settings: &Settings) -> Result<AxumApp> {
    let store = match &settings.seed_path {
        Some(path) => MemoryStore::load(path).await?,
        None => MemoryStore::default(),
    };
    build_with(settings, Arc::new(store), Arc::new(SystemClock))
}

/// Build the server over an existing store and clock.
pub fn build_with(settings: &Settings, store: Arc<MemoryStore>, clock: Arc<dyn Clock>) -> Result<AxumApp> {
    let tokens = SessionTokens::from_options(&settings.auth)?;
    let verifiers = VerifierHandshake::from_options(&settings.auth)?;

    let sessions = Arc::new(SessionIssuer::new(
        verifiers,
        tokens.clone(),
        store.clone(),
        Arc::new(BcryptVerifier::default()),
    ));

    let strategy = HdxTokenStrategy::new(tokens).with_options((&settings.auth).into());

    let gateway = Gateway::new(
        modules::configure(sessions),
        TenantResolver::new(store),
        Arc::new(strategy),
        settings.gateway.clone(),
        clock,
    );

    Ok(axum(gateway))
}
