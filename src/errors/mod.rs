//! Error types for the GitHub client.
//!
//! Every failed call produces exactly one [`GitHubError`] variant:
//!
//! - [`GitHubError::Construction`]: the request was rejected before it was sent.
//! - [`GitHubError::Transport`]: no response was received.
//! - [`GitHubError::Api`]: the server answered with a non-2xx status.
//! - [`GitHubError::RateLimit`]: the server answered 403/429 because a quota is exhausted.
//! - [`GitHubError::Decode`]: a 2xx body did not decode into the requested type.
//!
//! [`check_response`] is the classifier the dispatcher runs on every response.

use crate::response::{Rate, Response, HEADER_RATE_REMAINING, HEADER_RETRY_AFTER};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for GitHub operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Boxed error used as an underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse category of a [`GitHubError`], for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before send.
    Construction,
    /// No response received.
    Transport,
    /// Non-2xx response.
    Api,
    /// Quota exhausted.
    RateLimit,
    /// Successful response that failed to decode.
    Decode,
}

/// GitHub client error.
#[derive(Error, Debug)]
pub enum GitHubError {
    /// Invalid input detected before any network I/O.
    #[error("[construction] {message}")]
    Construction {
        /// Error message.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Api(Box<ApiError>),

    /// The server refused the request because a rate limit is exhausted.
    #[error(transparent)]
    RateLimit(Box<RateLimitError>),

    /// The response body could not be decoded into the destination type.
    #[error("[decode] {message} (HTTP {})", .response.status().as_u16())]
    Decode {
        /// Error message.
        message: String,
        /// JSON error.
        #[source]
        source: serde_json::Error,
        /// Response envelope, including the undecodable body.
        response: Box<Response>,
    },
}

impl GitHubError {
    /// Creates a construction error.
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a construction error with an underlying cause.
    pub fn construction_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Construction {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a decode error for a response whose body did not match the destination type.
    pub fn decode(source: serde_json::Error, response: Response) -> Self {
        Self::Decode {
            message: format!("Failed to deserialize response: {}", source),
            source,
            response: Box::new(response),
        }
    }

    /// Gets the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Construction { .. } => ErrorKind::Construction,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Api(_) => ErrorKind::Api,
            Self::RateLimit(_) => ErrorKind::RateLimit,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Gets the HTTP status code, when a response was received.
    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|r| r.status().as_u16())
    }

    /// Gets the response envelope, when a response was received.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Api(e) => Some(e.response()),
            Self::RateLimit(e) => Some(e.response()),
            Self::Decode { response, .. } => Some(response),
            Self::Construction { .. } | Self::Transport(_) => None,
        }
    }

    /// Gets the rate-limit snapshot. Zero when no response was received.
    pub fn rate(&self) -> Rate {
        self.response().map(|r| r.rate().clone()).unwrap_or_default()
    }

    /// Gets the API error, if this is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Gets the rate-limit error, if this is one.
    pub fn as_rate_limit_error(&self) -> Option<&RateLimitError> {
        match self {
            Self::RateLimit(e) => Some(e),
            _ => None,
        }
    }

    /// Gets the transport error, if this is one.
    pub fn as_transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true for a 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self.as_api_error(), Some(e) if e.kind == ApiErrorKind::NotFound)
    }

    /// Returns true if a caller-level retry policy may reasonably retry.
    ///
    /// Advisory only: the client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.kind != TransportErrorKind::Cancelled,
            Self::RateLimit(_) => true,
            Self::Api(e) => matches!(
                e.kind,
                ApiErrorKind::InternalError | ApiErrorKind::BadGateway | ApiErrorKind::ServiceUnavailable
            ),
            Self::Construction { .. } | Self::Decode { .. } => false,
        }
    }
}

/// Transport failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS or TLS failure.
    Connect,
    /// Request timeout or context deadline.
    Timeout,
    /// Cancelled by the caller.
    Cancelled,
    /// Failed while reading the response body.
    Body,
    /// Anything else.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Body => write!(f, "body_read_failed"),
            Self::Other => write!(f, "transport_error"),
        }
    }
}

/// A request that produced no response.
#[derive(Error, Debug)]
#[error("[{kind}] {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// Creates a new transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Sets the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a cancellation error.
    pub fn cancelled() -> Self {
        Self::new(TransportErrorKind::Cancelled, "Request cancelled")
    }

    /// Creates a deadline error.
    pub fn deadline_exceeded(limit: Duration) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("Request deadline of {}ms exceeded", limit.as_millis()),
        )
    }

    /// Maps a reqwest error, redacting secrets from the URL it mentions.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };

        let url = err
            .url()
            .map(|u| crate::observability::sanitize_url(u.as_str()));
        let err = err.without_url();
        let message = match url {
            Some(url) => format!("{} ({})", err, url),
            None => err.to_string(),
        };

        Self::new(kind, message).with_source(err)
    }

    /// Gets the failure category.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Gets the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// API error categories derived from the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Bad request (400).
    BadRequest,
    /// Bad credentials (401).
    BadCredentials,
    /// Access forbidden (403).
    Forbidden,
    /// Resource not found (404).
    NotFound,
    /// Resource conflict (409).
    Conflict,
    /// Resource is gone (410).
    Gone,
    /// Validation failed (422).
    UnprocessableEntity,
    /// Too many requests without an exhausted quota (429).
    TooManyRequests,
    /// Internal server error (500).
    InternalError,
    /// Bad gateway (502).
    BadGateway,
    /// Service unavailable (503).
    ServiceUnavailable,
    /// Any other status.
    Unknown,
}

impl ApiErrorKind {
    /// Maps HTTP status code to error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::BadCredentials,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            410 => Self::Gone,
            422 => Self::UnprocessableEntity,
            429 => Self::TooManyRequests,
            500 => Self::InternalError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad_request"),
            Self::BadCredentials => write!(f, "bad_credentials"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Gone => write!(f, "gone"),
            Self::UnprocessableEntity => write!(f, "unprocessable_entity"),
            Self::TooManyRequests => write!(f, "too_many_requests"),
            Self::InternalError => write!(f, "internal_error"),
            Self::BadGateway => write!(f, "bad_gateway"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Field-level validation error reported by GitHub.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldError {
    /// Resource on which the error occurred.
    pub resource: Option<String>,
    /// Field on which the error occurred.
    pub field: Option<String>,
    /// Validation error code.
    pub code: Option<String>,
    /// Message describing the error.
    pub message: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code.as_deref().unwrap_or("invalid");
        match (&self.field, &self.resource) {
            (Some(field), Some(resource)) => {
                write!(f, "{} error caused by {} field on {} resource", code, field, resource)?
            }
            (Some(field), None) => write!(f, "{} error caused by {} field", code, field)?,
            _ => write!(f, "{} error", code)?,
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

// GitHub occasionally sends plain strings in the `errors` array.
impl<'de> Deserialize<'de> for FieldError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Detailed {
            resource: Option<String>,
            field: Option<String>,
            code: Option<String>,
            message: Option<String>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Detailed(Detailed),
            Plain(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Detailed(d) => FieldError {
                resource: d.resource,
                field: d.field,
                code: d.code,
                message: d.message,
            },
            Raw::Plain(message) => FieldError {
                message: Some(message),
                ..Default::default()
            },
        })
    }
}

/// GitHub error response format.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    documentation_url: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

impl ErrorBody {
    /// Parses the body, falling back to its raw text as the message.
    fn parse(status: u16, body: &[u8]) -> Self {
        let mut parsed = serde_json::from_slice::<ErrorBody>(body).unwrap_or_default();
        if parsed.message.is_empty() && parsed.errors.is_empty() {
            let text = String::from_utf8_lossy(body).trim().to_string();
            parsed.message = if text.is_empty() {
                format!("HTTP {} error", status)
            } else {
                text
            };
        }
        parsed
    }

    fn is_secondary_rate_limit(&self) -> bool {
        self.documentation_url.as_deref().map_or(false, |url| {
            url.contains("secondary-rate-limits") || url.ends_with("#abuse-rate-limits")
        })
    }
}

/// Non-2xx response from the API.
#[derive(Debug, Clone)]
pub struct ApiError {
    kind: ApiErrorKind,
    status: u16,
    message: String,
    documentation_url: Option<String>,
    errors: Vec<FieldError>,
    request_id: Option<String>,
    response: Response,
}

impl ApiError {
    /// Gets the error kind.
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Gets the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Gets the message reported by GitHub, or the raw body text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the documentation URL.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Gets the field-level errors.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Gets the GitHub request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Gets the response envelope, including the raw body.
    pub fn response(&self) -> &Response {
        &self.response
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (HTTP {})", self.kind, self.message, self.status)?;
        if let Some(ref id) = self.request_id {
            write!(f, " [request_id: {}]", id)?;
        }
        if !self.errors.is_empty() {
            let details: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", details.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Which rate limit was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
    /// Primary quota exhausted (`x-ratelimit-remaining: 0`).
    Primary,
    /// Secondary (abuse) limit.
    Secondary,
}

impl fmt::Display for RateLimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary_rate_limit_exceeded"),
            Self::Secondary => write!(f, "secondary_rate_limit_exceeded"),
        }
    }
}

/// Quota exhaustion reported by the API.
#[derive(Debug, Clone)]
pub struct RateLimitError {
    kind: RateLimitKind,
    message: String,
    retry_after: Option<Duration>,
    response: Response,
}

impl RateLimitError {
    /// Gets the rate limit kind.
    pub fn kind(&self) -> RateLimitKind {
        self.kind
    }

    /// Gets the message reported by GitHub.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the rate-limit snapshot taken from the response headers.
    pub fn rate(&self) -> &Rate {
        self.response.rate()
    }

    /// Gets the time when the quota resets.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.response.rate().reset
    }

    /// Returns how long to wait before trying again.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after.or_else(|| {
            let reset = self.reset_at()?;
            (reset - Utc::now()).to_std().ok()
        })
    }

    /// Gets the response envelope.
    pub fn response(&self) -> &Response {
        &self.response
    }
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (HTTP {})",
            self.kind,
            self.message,
            self.response.status().as_u16()
        )?;
        match self.kind {
            RateLimitKind::Primary => {
                if let Some(reset) = self.reset_at() {
                    write!(f, " [resets at {}]", reset)?;
                }
            }
            RateLimitKind::Secondary => {
                if let Some(wait) = self.retry_after {
                    write!(f, " [retry after {}s]", wait.as_secs())?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for RateLimitError {}

/// Classifies a completed response.
///
/// 2xx returns `Ok(())`. Anything else becomes a [`GitHubError::RateLimit`] or
/// [`GitHubError::Api`] carrying the envelope with `body` attached.
pub fn check_response(response: &Response, body: &Bytes) -> GitHubResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let code = status.as_u16();
    let parsed = ErrorBody::parse(code, body);
    let response = response.clone().with_body(body.clone());

    if code == 403 || code == 429 {
        if response.header_str(HEADER_RATE_REMAINING) == Some("0") {
            return Err(GitHubError::RateLimit(Box::new(RateLimitError {
                kind: RateLimitKind::Primary,
                message: parsed.message,
                retry_after: None,
                response,
            })));
        }

        let retry_after = response
            .header_str(HEADER_RETRY_AFTER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        if retry_after.is_some() || parsed.is_secondary_rate_limit() {
            return Err(GitHubError::RateLimit(Box::new(RateLimitError {
                kind: RateLimitKind::Secondary,
                message: parsed.message,
                retry_after,
                response,
            })));
        }
    }

    Err(GitHubError::Api(Box::new(ApiError {
        kind: ApiErrorKind::from_status(code),
        status: code,
        message: parsed.message,
        documentation_url: parsed.documentation_url,
        errors: parsed.errors,
        request_id: response.request_id().map(String::from),
        response,
    })))
}
