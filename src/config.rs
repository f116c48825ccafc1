//! Client configuration.

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{CimiError, Result};

/// Cloud entry point of the public Nuvla service.
pub const DEFAULT_ENDPOINT: &str = "https://nuv.la/api/cloud-entry-point";

const USER_AGENT: &str = concat!("cimi-client/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const ENTRY_POINT_SEGMENT: &str = "cloud-entry-point";

/// Settings used to construct a [`CimiClient`](crate::CimiClient).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cimi::ClientConfig;
///
/// let config = ClientConfig::new("https://cimi.example.com")
///     .with_timeout(Duration::from_secs(30))
///     .with_insecure(true);
/// assert_eq!(
///     config.entry_point_url().unwrap().as_str(),
///     "https://cimi.example.com/api/cloud-entry-point"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root or full cloud entry point URL.
    pub endpoint: String,
    /// Per-request timeout; expiry surfaces as a transport error.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Accept invalid TLS certificates (test servers only).
    pub insecure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            insecure: false,
        }
    }
}

impl ClientConfig {
    /// Configuration targeting the given endpoint with default settings.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            ..Self::default()
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `CIMI_ENDPOINT` (optional) - server root or cloud entry point URL
    /// - `CIMI_TIMEOUT_SECS` (optional) - request timeout in seconds
    /// - `CIMI_INSECURE` (optional) - `true`/`1` to skip TLS verification
    ///
    /// # Errors
    ///
    /// Returns an error if `CIMI_TIMEOUT_SECS` is not a whole number.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(endpoint) = env::var("CIMI_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(secs) = env::var("CIMI_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CimiError::ConfigMissing(format!(
                    "CIMI_TIMEOUT_SECS must be a number of seconds, got '{secs}'"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(flag) = env::var("CIMI_INSECURE") {
            config.insecure = matches!(flag.trim(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Absolute URL of the cloud entry point document.
    ///
    /// An endpoint whose path already ends in `cloud-entry-point` is used
    /// unchanged. A path ending in `api` gets `cloud-entry-point` appended;
    /// anything else is treated as the server root and gets
    /// `api/cloud-entry-point`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute URL.
    pub fn entry_point_url(&self) -> Result<Url> {
        let url = Url::parse(self.endpoint.trim())?;
        let path = url.path().trim_end_matches('/');

        if path.ends_with(ENTRY_POINT_SEGMENT) {
            return Ok(url);
        }

        let suffix = if path.ends_with("/api") {
            ENTRY_POINT_SEGMENT.to_string()
        } else {
            format!("api/{ENTRY_POINT_SEGMENT}")
        };

        let mut base = url;
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        Ok(base.join(&suffix)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_is_used_verbatim() {
        let config = ClientConfig::default();
        assert_eq!(config.entry_point_url().unwrap().as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(!config.insecure);
    }

    #[test]
    fn test_server_root_gets_entry_point_path() {
        for endpoint in ["http://localhost:8201", "http://localhost:8201/"] {
            let url = ClientConfig::new(endpoint).entry_point_url().unwrap();
            assert_eq!(url.as_str(), "http://localhost:8201/api/cloud-entry-point");
        }
    }

    #[test]
    fn test_api_prefix_is_not_duplicated() {
        let url = ClientConfig::new("https://cimi.example.com/api")
            .entry_point_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://cimi.example.com/api/cloud-entry-point");
    }

    #[test]
    fn test_relative_endpoint_is_rejected() {
        let err = ClientConfig::new("not a url").entry_point_url().unwrap_err();
        assert!(matches!(err, CimiError::UrlError(_)));
    }
}
