use std::collections::HashMap;

/// Transport-agnostic view of an inbound request.
///
/// Header names are stored lower-cased. `form` holds decoded
/// `application/x-www-form-urlencoded` fields, when the body was a form.
#[derive(Debug, Clone, Default)]
pub struct GatewayRequest {
    pub method: String,
    pub host: String,
    pub path: String,
    pub peer: Option<String>,
    pub headers: HashMap<String, String>,
    pub form: HashMap<String, String>,
}

impl GatewayRequest {
    pub fn new(method: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(name.into(), value.into());
        self
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| self.headers.get(&name.to_ascii_lowercase()))
            .map(|s| s.as_str())
    }

    /// Non-empty form field.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .get(name)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Split a request path into `(resource, sub_path)` after removing `prefix`.
///
/// `/api/users/42/` with prefix `/api/` gives `("users", Some("42"))`.
pub fn route_from_path(path: &str, prefix: &str) -> (String, Option<String>) {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path
        .strip_prefix(prefix)
        .unwrap_or(path)
        .trim_matches('/');

    match trimmed.split_once('/') {
        Some((resource, rest)) => {
            let rest = rest.trim_matches('/');
            let sub = (!rest.is_empty()).then(|| rest.to_string());
            (resource.to_string(), sub)
        }
        None => (trimmed.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_are_split_after_prefix() {
        assert_eq!(route_from_path("/api/users", "/api/"), ("users".into(), None));
        assert_eq!(
            route_from_path("/api/users/42/", "/api/"),
            ("users".into(), Some("42".into()))
        );
        assert_eq!(route_from_path("/api/init?x=1", "/api/"), ("init".into(), None));
        assert_eq!(route_from_path("/sessions", "/api/"), ("sessions".into(), None));
        assert_eq!(route_from_path("/api/", "/api/"), (String::new(), None));
    }

    #[test]
    fn headers_match_case_insensitively() {
        let req = GatewayRequest::new("GET", "shop.example.com", "/api/init")
            .with_header("User-Agent", "curl/8");
        assert_eq!(req.header("user-agent"), Some("curl/8"));
        assert_eq!(req.header("User-Agent"), Some("curl/8"));
        assert_eq!(req.header("verifier"), None);
    }
}
