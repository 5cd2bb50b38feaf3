//! # HDX Configuration
//!
//! A minimal string key/value store. Components never read it directly:
//! the binary fills an `HdxConfig`, takes a snapshot, and builds typed
//! options (`AuthOptions`, `GatewaySettings`) from that snapshot once at
//! startup.
//!
//! ```rust
//! use hdx_core::HdxConfig;
//! let mut config = HdxConfig::new();
//!
//! config.set("gateway.domain_suffix", ".example.com");
//! config.set("http.port", "9090");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_u64("http.port"), Some(9090));
//! ```
//!
//! ## Environment overrides
//! [`HdxConfig::load_env`] maps `HDX__AUTH__SESSION_TTL=20m` to the key
//! `auth.session_ttl`. Values set from the environment replace defaults.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct HdxConfig {
    values: HashMap<String, String>,
}

impl HdxConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when nothing has been stored under it yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Import every variable starting with `prefix` from the given iterator.
    ///
    /// `PREFIX` + `AUTH__SESSION_TTL` becomes `auth.session_ttl`.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loaded = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if normalized.is_empty() {
                    continue;
                }
                self.set(normalized, value);
                loaded += 1;
            }
        }
        loaded
    }

    /// [`HdxConfig::load_vars`] over the process environment.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    pub fn snapshot(&self) -> HdxConfigSnapshot {
        HdxConfigSnapshot::new(self.values.clone())
    }
}

/// Read-only copy of the configuration taken at startup.
#[derive(Debug, Clone, Default)]
pub struct HdxConfigSnapshot {
    map: HashMap<String, String>,
}

impl HdxConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }
}
