//! GitHub API client: request dispatch.
//!
//! One call is one round trip: build a [`Request`], hand it to
//! [`GitHubClient::execute`] (or one of its variants) with a
//! [`RequestContext`], and get back either the decoded value plus the
//! [`Response`] envelope, or a [`GitHubError`]. Nothing is retried.

use crate::auth::AuthMethod;
use crate::config::{GitHubConfig, GitHubConfigBuilder};
use crate::errors::{check_response, GitHubError, GitHubResult, TransportError};
use crate::observability::{sanitize_url, TracingHooks};
use crate::request::{Request, RequestContext, RequestFactory};
use crate::response::Response;
use crate::transport::{HttpTransport, RawResponse, ReqwestTransport};
use bytes::Bytes;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// GitHub API client.
///
/// Cheap to clone and safe to share between tasks: dispatch never writes
/// shared state.
#[derive(Clone)]
pub struct GitHubClient {
    /// Configuration.
    config: Arc<GitHubConfig>,
    /// Request builder bound to the configured base URL.
    requests: RequestFactory,
    /// HTTP transport.
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Creates a new GitHub client using the reqwest transport.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(config: GitHubConfig, transport: Arc<dyn HttpTransport>) -> GitHubResult<Self> {
        let requests = RequestFactory::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            requests,
            transport,
        })
    }

    /// Creates a new client builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &Url {
        self.requests.base_url()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Builds a request for `path`, relative to the base URL.
    ///
    /// See [`RequestFactory::build`] for the rules applied to `path` and `body`.
    pub fn new_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> GitHubResult<Request> {
        self.requests.build(method, path, body)
    }

    /// Sends the request and decodes a successful body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<_>` accept
    /// 204 responses.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: Request,
    ) -> GitHubResult<(T, Response)> {
        let (body, response) = self.execute_raw(ctx, request).await?;

        match decode_body(&body) {
            Ok(value) => Ok((value, response)),
            Err(e) => Err(GitHubError::decode(e, response.with_body(body))),
        }
    }

    /// Sends the request without a destination. A successful body is discarded.
    pub async fn execute_empty(&self, ctx: &RequestContext, request: Request) -> GitHubResult<Response> {
        let (_, response) = self.execute_raw(ctx, request).await?;
        Ok(response)
    }

    /// Sends the request and hands back the successful body undecoded.
    pub async fn execute_raw(
        &self,
        ctx: &RequestContext,
        request: Request,
    ) -> GitHubResult<(Bytes, Response)> {
        let method = request.method().clone();
        let url = sanitize_url(request.url().as_str());

        TracingHooks::on_request_start(method.as_str(), &url);
        TracingHooks::on_request_headers(request.headers());
        let started = Instant::now();

        let raw = match self.send(ctx, request).await {
            Ok(raw) => raw,
            Err(err) => {
                TracingHooks::on_request_error(method.as_str(), &url, &err.to_string());
                return Err(err.into());
            }
        };

        let RawResponse { status, headers, body } = raw;
        let response = Response::new(status, headers);
        TracingHooks::on_request_complete(method.as_str(), &url, status.as_u16(), started.elapsed());
        TracingHooks::on_rate_limit_update(response.rate());

        if let Err(err) = check_response(&response, &body) {
            match err.as_rate_limit_error() {
                Some(limited) => {
                    TracingHooks::on_rate_limit_exceeded(&limited.kind().to_string(), limited.rate())
                }
                None => TracingHooks::on_request_error(method.as_str(), &url, &err.to_string()),
            }
            return Err(err);
        }

        Ok((body, response))
    }

    /// Sends through the transport, honouring cancellation and the deadline.
    async fn send(&self, ctx: &RequestContext, request: Request) -> Result<RawResponse, TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::cancelled());
        }

        let transport = self.transport.send(request);
        let bounded = async {
            match ctx.timeout() {
                Some(limit) => match tokio::time::timeout(limit, transport).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::deadline_exceeded(limit)),
                },
                None => transport.await,
            }
        };

        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(TransportError::cancelled()),
            result = bounded => result,
        }
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_slice(b"null")
    } else {
        serde_json::from_slice(body)
    }
}

/// Builder for GitHubClient.
pub struct GitHubClientBuilder {
    config_builder: GitHubConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl GitHubClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: GitHubConfig::builder(),
            transport: None,
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets a GitHub Enterprise Server URL.
    pub fn enterprise_url(mut self, url: impl AsRef<str>) -> Self {
        self.config_builder = self.config_builder.enterprise_url(url);
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config_builder = self.config_builder.auth(auth);
        self
    }

    /// Sets a personal access token.
    pub fn pat(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::pat(token))
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Adds a header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.default_header(name, value);
        self
    }

    /// Uses a custom transport instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let config = self.config_builder.build()?;
        match self.transport {
            Some(transport) => GitHubClient::with_transport(config, transport),
            None => GitHubClient::new(config),
        }
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
