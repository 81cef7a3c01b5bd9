//! Mock transport for testing code built on the GitHub client.

use crate::errors::{TransportError, TransportErrorKind};
use crate::request::Request;
use crate::transport::{HttpTransport, RawResponse};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Headers.
    pub headers: Vec<(String, String)>,
    /// Delay before responding.
    pub delay: Option<std::time::Duration>,
}

impl MockResponse {
    /// Creates a response with the given status and raw body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
            delay: None,
        }
    }

    /// Creates a successful response with the given body.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::new(200, serde_json::to_string(body).unwrap_or_default())
    }

    /// Creates a 204 No Content response.
    pub fn no_content() -> Self {
        Self::new(204, "")
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: &str) -> Self {
        Self::new(
            404,
            serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Creates a 422 Validation Failed response.
    pub fn validation_failed(message: &str, errors: Vec<(&str, &str, &str)>) -> Self {
        let errors: Vec<_> = errors
            .into_iter()
            .map(|(resource, field, code)| {
                serde_json::json!({
                    "resource": resource,
                    "field": field,
                    "code": code
                })
            })
            .collect();

        Self::new(
            422,
            serde_json::json!({
                "message": message,
                "errors": errors,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Creates a primary rate limit exceeded response.
    pub fn rate_limited() -> Self {
        let reset_at = Utc::now() + Duration::minutes(1);
        Self::new(
            403,
            serde_json::json!({
                "message": "API rate limit exceeded",
                "documentation_url": "https://docs.github.com/rest/overview/resources-in-the-rest-api#rate-limiting"
            })
            .to_string(),
        )
        .with_rate_limit(5000, 0, reset_at.timestamp())
    }

    /// Creates a secondary rate limit response.
    pub fn secondary_rate_limited(retry_after_secs: u64) -> Self {
        Self::new(
            403,
            serde_json::json!({
                "message": "You have exceeded a secondary rate limit.",
                "documentation_url": "https://docs.github.com/rest/overview/rate-limits-for-the-rest-api#about-secondary-rate-limits"
            })
            .to_string(),
        )
        .with_header("retry-after", &retry_after_secs.to_string())
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(message: &str) -> Self {
        Self::new(500, serde_json::json!({ "message": message }).to_string())
    }

    /// Adds a delay to the response.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds rate limit headers.
    pub fn with_rate_limit(self, limit: u32, remaining: u32, reset_timestamp: i64) -> Self {
        self.with_header("x-ratelimit-limit", &limit.to_string())
            .with_header("x-ratelimit-remaining", &remaining.to_string())
            .with_header("x-ratelimit-reset", &reset_timestamp.to_string())
    }

    fn into_raw(self) -> Result<RawResponse, TransportError> {
        let status = StatusCode::from_u16(self.status).map_err(|e| {
            TransportError::new(TransportErrorKind::Other, format!("Invalid mock status {}", self.status))
                .with_source(e)
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::new(TransportErrorKind::Other, "Invalid mock header name").with_source(e)
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::new(TransportErrorKind::Other, "Invalid mock header value").with_source(e)
            })?;
            headers.append(name, value);
        }

        Ok(RawResponse {
            status,
            headers,
            body: Bytes::from(self.body),
        })
    }
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Respond(MockResponse),
    Fail(TransportErrorKind, String),
}

#[derive(Debug, Default)]
struct MockState {
    outcomes: VecDeque<MockOutcome>,
    requests: Vec<Request>,
}

/// Transport that replays queued responses in order and records every request.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues a response.
    pub fn push_response(&self, response: MockResponse) -> &Self {
        self.state().outcomes.push_back(MockOutcome::Respond(response));
        self
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, kind: TransportErrorKind, message: &str) -> &Self {
        self.state()
            .outcomes
            .push_back(MockOutcome::Fail(kind, message.to_string()));
        self
    }

    /// Gets every request sent so far.
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    /// Gets the number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: Request) -> Result<RawResponse, TransportError> {
        let outcome = {
            let mut state = self.state();
            state.requests.push(request);
            state.outcomes.pop_front()
        };

        match outcome {
            Some(MockOutcome::Respond(response)) => {
                if let Some(delay) = response.delay {
                    tokio::time::sleep(delay).await;
                }
                response.into_raw()
            }
            Some(MockOutcome::Fail(kind, message)) => Err(TransportError::new(kind, message)),
            None => Err(TransportError::new(
                TransportErrorKind::Other,
                "No mock response queued",
            )),
        }
    }
}
