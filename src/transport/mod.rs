//! HTTP transport seam.
//!
//! The dispatcher hands a finished [`Request`] to an [`HttpTransport`] and
//! gets back the status, headers and the fully read body. Dropping the send
//! future releases the underlying connection.

use crate::config::GitHubConfig;
use crate::errors::{GitHubError, GitHubResult, TransportError};
use crate::request::Request;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};

/// A response as received from the wire.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Fully read body.
    pub body: Bytes,
}

/// Sends one request and reads its whole response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request. Errors only when no response was received.
    async fn send(&self, request: Request) -> Result<RawResponse, TransportError>;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Creates a transport using the timeouts and pool settings of `config`.
    pub fn new(config: &GitHubConfig) -> GitHubResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .build()
            .map_err(|e| GitHubError::construction_with_source("Failed to create HTTP client", e))?;

        Ok(Self { http })
    }

    /// Wraps an existing client.
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<RawResponse, TransportError> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(TransportError::from_reqwest)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
