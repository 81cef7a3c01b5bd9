//! Configuration types for the GitHub client.

use crate::auth::AuthMethod;
use crate::errors::GitHubError;
use std::time::Duration;
use url::Url;

/// Default GitHub API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com/";

/// Default GitHub API version (date-based).
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = concat!("integrations-github-core/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding a token.
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "GITHUB_API_URL";

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle connections per host.
    pub max_idle_per_host: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// GitHub client configuration.
///
/// Each client owns its configuration; nothing here is process-wide.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API base URL. Always ends in `/`.
    pub base_url: String,
    /// API version header.
    pub api_version: String,
    /// Authentication method. Unauthenticated when `None`.
    pub auth: Option<AuthMethod>,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Headers sent with every request.
    pub default_headers: Vec<(String, String)>,
    /// Connection pool configuration.
    pub pool: PoolConfig,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: Vec::new(),
            pool: PoolConfig::default(),
        }
    }
}

impl GitHubConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GitHubConfigBuilder {
        GitHubConfigBuilder::new()
    }

    /// Builds a configuration from `GITHUB_TOKEN` and `GITHUB_API_URL`.
    pub fn from_env() -> Result<Self, GitHubError> {
        let mut builder = Self::builder();
        if let Some(url) = std::env::var(ENV_API_URL).ok().filter(|v| !v.is_empty()) {
            builder = builder.base_url(url);
        }
        if let Some(token) = std::env::var(ENV_TOKEN).ok().filter(|v| !v.is_empty()) {
            builder = builder.auth(AuthMethod::pat(token));
        }
        builder.build()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.base_url.is_empty() {
            return Err(GitHubError::construction("Base URL cannot be empty"));
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| GitHubError::construction_with_source("Invalid base URL", e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(GitHubError::construction(
                "Base URL must start with http:// or https://",
            ));
        }
        if !self.base_url.ends_with('/') {
            return Err(GitHubError::construction(format!(
                "Base URL must have a trailing slash, got {:?}",
                self.base_url
            )));
        }

        if self.user_agent.is_empty() {
            return Err(GitHubError::construction("User-Agent is required by GitHub API"));
        }

        Ok(())
    }
}

/// Ensures a trailing slash.
fn with_trailing_slash(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        format!("{}/", url)
    }
}

/// Normalizes a GitHub Enterprise Server URL to its REST API root.
///
/// `https://github.example.com` becomes `https://github.example.com/api/v3/`.
/// URLs already pointing at an API host or path are only given a trailing slash.
pub fn enterprise_base_url(url: &str) -> String {
    let url = with_trailing_slash(url.to_string());
    let host = Url::parse(&url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_default();

    if url.ends_with("/api/v3/") || host.starts_with("api.") || host.contains(".api.") {
        url
    } else {
        format!("{}api/v3/", url)
    }
}

/// Builder for GitHubConfig.
#[derive(Debug, Default)]
pub struct GitHubConfigBuilder {
    base_url: Option<String>,
    api_version: Option<String>,
    auth: Option<AuthMethod>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Vec<(String, String)>,
    pool: Option<PoolConfig>,
}

impl GitHubConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL. A missing trailing slash is added.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(with_trailing_slash(url.into()));
        self
    }

    /// Sets a GitHub Enterprise Server URL, see [`enterprise_base_url`].
    pub fn enterprise_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = Some(enterprise_base_url(url.as_ref()));
        self
    }

    /// Sets the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Adds a header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the connection pool configuration.
    pub fn pool(mut self, config: PoolConfig) -> Self {
        self.pool = Some(config);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<GitHubConfig, GitHubError> {
        let config = GitHubConfig {
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            auth: self.auth,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            default_headers: self.default_headers,
            pool: self.pool.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = GitHubConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert!(config.auth.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = GitHubConfig::builder()
            .base_url("https://github.example.com/api/v3")
            .user_agent("test-client/1.0")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://github.example.com/api/v3/");
        assert_eq!(config.user_agent, "test-client/1.0");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GitHubConfig::builder().base_url("invalid-url").build();
        assert!(result.is_err());

        let result = GitHubConfig::builder().base_url("ftp://example.com").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_trailing_slash_rejected_by_validate() {
        let config = GitHubConfig {
            base_url: "https://api.github.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        assert!(GitHubConfig::builder().user_agent("").build().is_err());
    }

    #[test_case("https://github.example.com", "https://github.example.com/api/v3/" ; "bare host")]
    #[test_case("https://github.example.com/", "https://github.example.com/api/v3/" ; "trailing slash")]
    #[test_case("https://github.example.com/api/v3", "https://github.example.com/api/v3/" ; "already api path")]
    #[test_case("https://api.github.example.com", "https://api.github.example.com/" ; "api subdomain")]
    #[test_case("https://github.api.example.com", "https://github.api.example.com/" ; "api infix")]
    fn test_enterprise_base_url(input: &str, expected: &str) {
        assert_eq!(enterprise_base_url(input), expected);
    }
}
