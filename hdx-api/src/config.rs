use anyhow::{anyhow, Result};
use hdx_auth::AuthOptions;
use hdx_axum::GatewaySettings;
use hdx_core::{HdxConfig, HdxConfigSnapshot};
use tracing::{debug, warn};

/// Environment prefix: `HDX__AUTH__SESSION_TTL=20m` sets `auth.session_ttl`.
pub const ENV_PREFIX: &str = "HDX__";

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub gateway: GatewaySettings,
    pub auth: AuthOptions,
    pub seed_path: Option<String>,
}

impl Settings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Defaults first, then `HDX__*` from the process environment.
pub fn load() -> Result<Settings> {
    let mut config = HdxConfig::new();
    defaults(&mut config);
    let loaded = config.load_env(ENV_PREFIX);
    debug!(loaded, "configuration read from environment");
    resolve(&config.snapshot())
}

pub fn defaults(config: &mut HdxConfig) {
    // HTTP Server Configuration
    config.set_default("http.host", "127.0.0.1");
    config.set_default("http.port", "9090");

    // Gateway Configuration
    let gateway = GatewaySettings::default();
    config.set_default("gateway.domain_suffix", gateway.domain_suffix);
    config.set_default("gateway.path_prefix", gateway.path_prefix);
    config.set_default("gateway.origin_header", gateway.origin_header);

    // Store Configuration
    config.set_default("store.seed_path", "seed.json");
}

pub fn resolve(snapshot: &HdxConfigSnapshot) -> Result<Settings> {
    let auth = AuthOptions::from_snapshot(snapshot).map_err(|e| anyhow!(e))?;
    auth.validate().map_err(|e| anyhow!("invalid auth configuration: {e}"))?;

    let host = snapshot
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());

    let port = match snapshot.get("http.port") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|e| anyhow!("invalid http.port {raw:?}: {e}"))?,
        None => 9090,
    };

    let seed_path = snapshot
        .get_string("store.seed_path")
        .filter(|p| !p.trim().is_empty());
    if seed_path.is_none() {
        warn!("store.seed_path is empty, starting with no tenants");
    }

    Ok(Settings {
        host,
        port,
        gateway: GatewaySettings::from_snapshot(snapshot),
        auth,
        seed_path,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn configured(vars: &[(&str, &str)]) -> HdxConfig {
        let mut config = HdxConfig::new();
        defaults(&mut config);
        config.load_vars(
            ENV_PREFIX,
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        );
        config
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = configured(&[
            ("HDX__AUTH__SESSION_SECRET", "s"),
            ("HDX__AUTH__VERIFIER_SECRET", "v"),
            ("HDX__HTTP__PORT", "8081"),
            ("HDX__AUTH__SESSION_TTL", "30m"),
        ]);

        let settings = resolve(&config.snapshot()).unwrap();
        assert_eq!(settings.addr(), "127.0.0.1:8081");
        assert_eq!(settings.auth.session_ttl, Duration::from_secs(1800));
        assert_eq!(settings.gateway.path_prefix, "/api/");
        assert_eq!(settings.seed_path.as_deref(), Some("seed.json"));
    }

    #[test]
    fn missing_secrets_fail_startup() {
        let config = configured(&[]);
        assert!(resolve(&config.snapshot()).is_err());
    }

    #[test]
    fn bad_port_fails_startup() {
        let config = configured(&[
            ("HDX__AUTH__SESSION_SECRET", "s"),
            ("HDX__AUTH__VERIFIER_SECRET", "v"),
            ("HDX__HTTP__PORT", "http"),
        ]);
        assert!(resolve(&config.snapshot()).is_err());
    }
}
