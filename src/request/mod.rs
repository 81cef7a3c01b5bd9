//! Outbound request construction.
//!
//! [`RequestFactory`] turns a method, a path relative to the configured base
//! URL and an optional JSON body into a [`Request`]. Nothing here touches the
//! network.

use crate::config::GitHubConfig;
use crate::errors::{GitHubError, GitHubResult};
use crate::pagination::add_options;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Media type requested on every call.
pub const MEDIA_TYPE_JSON: &str = "application/vnd.github+json";

/// Header carrying the date-based API version.
pub const HEADER_API_VERSION: &str = "x-github-api-version";

/// Typed "no body" value for [`RequestFactory::build`].
pub const NO_BODY: Option<&()> = None;

/// A fully formed outbound request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Appends list options to the query string. `None` means no pagination.
    pub fn with_options<O: Serialize + ?Sized>(mut self, opts: Option<&O>) -> GitHubResult<Self> {
        add_options(&mut self.url, opts)?;
        Ok(self)
    }

    /// Sets a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Gets the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Gets the absolute URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Gets the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets the serialized JSON body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Splits the request into method, URL, headers and body.
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builds requests against one configured base URL.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    base_url: Url,
    headers: HeaderMap,
}

impl RequestFactory {
    /// Creates a factory from the client configuration.
    pub fn from_config(config: &GitHubConfig) -> GitHubResult<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GitHubError::construction_with_source("Invalid base URL", e))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GitHubError::construction_with_source(format!("Invalid default header name: {}", name), e)
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                GitHubError::construction_with_source(format!("Invalid value for header {}", name), e)
            })?;
            headers.insert(name, value);
        }

        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE_JSON));
        headers.insert(
            HeaderName::from_static(HEADER_API_VERSION),
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| GitHubError::construction_with_source("Invalid API version", e))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| GitHubError::construction_with_source("Invalid User-Agent", e))?,
        );
        if let Some(ref auth) = config.auth {
            headers.insert(AUTHORIZATION, auth.header_value()?);
        }

        Ok(Self { base_url, headers })
    }

    /// Gets the base URL. Always ends in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds a request for `path`, relative to the base URL.
    ///
    /// The path must not start with `/` and must not contain control
    /// characters or malformed percent escapes. When `body` is present it is
    /// serialized to JSON and `Content-Type: application/json` is set.
    pub fn build<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> GitHubResult<Request> {
        validate_path(path)?;

        let url = self
            .base_url
            .join(path)
            .map_err(|e| GitHubError::construction_with_source(format!("Invalid path {:?}", path), e))?;

        let mut request = Request::new(method, url);
        request.headers = self.headers.clone();

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| GitHubError::construction_with_source("Failed to serialize request body", e))?;
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.body = Some(Bytes::from(bytes));
        }

        Ok(request)
    }
}

/// Rejects paths the base-URL join would silently rewrite.
pub fn validate_path(path: &str) -> GitHubResult<()> {
    if path.starts_with('/') {
        return Err(GitHubError::construction(format!(
            "Path {:?} must be relative to the base URL (no leading slash)",
            path
        )));
    }

    if let Some(c) = path.chars().find(|c| c.is_control()) {
        return Err(GitHubError::construction(format!(
            "Path {:?} contains control character {:?}",
            path, c
        )));
    }

    let bytes = path.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !matches!(escape, Some(pair) if pair.iter().all(u8::is_ascii_hexdigit)) {
                return Err(GitHubError::construction(format!(
                    "Path {:?} contains an invalid escape at byte {}",
                    path, i
                )));
            }
        }
    }

    Ok(())
}

/// Per-call cancellation and deadline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancellation: CancellationToken,
    timeout: Option<Duration>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Sets a deadline for the whole call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses the given token for cancellation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Gets the cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Gets the deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns true once the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
