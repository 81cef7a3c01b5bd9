//! Credentials attached to outbound requests.
//!
//! Only static bearer tokens are handled here. Obtaining or refreshing them
//! (GitHub App JWTs, installation tokens, OAuth flows) happens outside this crate.

use crate::errors::{GitHubError, GitHubResult};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

/// Authentication method for GitHub API.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Personal Access Token (classic or fine-grained).
    Pat(SecretString),
    /// OAuth access token.
    OAuth(SecretString),
    /// GitHub Actions token (from GITHUB_TOKEN).
    Actions(SecretString),
    /// Installation token minted elsewhere for a GitHub App.
    Installation(SecretString),
}

impl AuthMethod {
    /// Creates a PAT authentication method.
    pub fn pat(token: impl Into<String>) -> Self {
        Self::Pat(SecretString::new(token.into()))
    }

    /// Creates an OAuth authentication method.
    pub fn oauth(token: impl Into<String>) -> Self {
        Self::OAuth(SecretString::new(token.into()))
    }

    /// Creates a GitHub Actions token authentication method.
    pub fn actions(token: impl Into<String>) -> Self {
        Self::Actions(SecretString::new(token.into()))
    }

    /// Creates an installation token authentication method.
    pub fn installation(token: impl Into<String>) -> Self {
        Self::Installation(SecretString::new(token.into()))
    }

    fn token(&self) -> &SecretString {
        match self {
            Self::Pat(t) | Self::OAuth(t) | Self::Actions(t) | Self::Installation(t) => t,
        }
    }

    /// Gets the token prefix for logging.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Self::Pat(t) => {
                let exposed = t.expose_secret();
                if exposed.starts_with("ghp_") {
                    "ghp_***"
                } else if exposed.starts_with("github_pat_") {
                    "github_pat_***"
                } else {
                    "***"
                }
            }
            Self::OAuth(_) => "gho_***",
            Self::Actions(_) | Self::Installation(_) => "ghs_***",
        }
    }

    /// Builds the `Authorization` header value, marked sensitive.
    pub fn header_value(&self) -> GitHubResult<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token().expose_secret()))
            .map_err(|e| GitHubError::construction_with_source("Token contains invalid header characters", e))?;
        value.set_sensitive(true);
        Ok(value)
    }
}
