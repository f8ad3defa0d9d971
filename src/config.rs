use url::Url;

use crate::error::{CliError, Result};

/// Basic-auth pair injected on every request by the credential transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuth {
    ApiKey(String),
    Basic(Credentials),
}

/// Where and how to reach the Grafana HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Domain name or IP address (with port) of the Grafana host.
    pub host: String,
    /// URL prefix for all API paths, relative to the host root.
    pub base_path: String,
    /// Transfer protocols, the first one is used.
    pub schemes: Vec<String>,
    pub auth: ApiAuth,
}

impl ConnectionConfig {
    /// Build the config from a server URL such as `http://localhost:3000`.
    pub fn from_server_url(server: &str, base_path: &str, auth: ApiAuth) -> Result<Self> {
        let parsed = Url::parse(server).map_err(|source| CliError::InvalidUrl {
            input: server.to_string(),
            source,
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| CliError::Config(format!("{} has no host", server)))?;
        let host = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            host,
            base_path: base_path.to_string(),
            schemes: vec![parsed.scheme().to_string()],
            auth,
        })
    }

    pub fn scheme(&self) -> &str {
        self.schemes.first().map(String::as_str).unwrap_or("http")
    }

    /// `<scheme>://<host>`
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme(), self.host)
    }

    /// `<scheme>://<host><base_path>` without a trailing slash.
    pub fn api_root(&self) -> String {
        let base = self.base_path.trim_end_matches('/');
        if base.is_empty() || base.starts_with('/') {
            format!("{}{}", self.origin(), base)
        } else {
            format!("{}/{}", self.origin(), base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_server_url_keeps_port_and_scheme() {
        let cfg = ConnectionConfig::from_server_url(
            "https://grafana.example.com:8443",
            "/api",
            ApiAuth::ApiKey("k".to_string()),
        )
        .unwrap();
        assert_eq!(cfg.host, "grafana.example.com:8443");
        assert_eq!(cfg.schemes, vec!["https".to_string()]);
        assert_eq!(cfg.api_root(), "https://grafana.example.com:8443/api");
    }

    #[test]
    fn test_api_root_normalizes_base_path() {
        let cfg = ConnectionConfig::from_server_url(
            "http://localhost:3000",
            "api/",
            ApiAuth::Basic(Credentials::new("admin", "admin")),
        )
        .unwrap();
        assert_eq!(cfg.api_root(), "http://localhost:3000/api");
        assert_eq!(cfg.origin(), "http://localhost:3000");
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = ConnectionConfig::from_server_url("not a url", "/api", ApiAuth::ApiKey(String::new()))
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidUrl { .. }));
        assert!(err.to_string().starts_with("not a url is not a valid url"));
    }
}
