//! Response envelope.

use crate::pagination::{PageInfo, PaginationLinks};
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

/// Request quota for the current window.
pub const HEADER_RATE_LIMIT: &str = "x-ratelimit-limit";
/// Requests left in the current window.
pub const HEADER_RATE_REMAINING: &str = "x-ratelimit-remaining";
/// Requests made in the current window.
pub const HEADER_RATE_USED: &str = "x-ratelimit-used";
/// Window reset time in epoch seconds.
pub const HEADER_RATE_RESET: &str = "x-ratelimit-reset";
/// Rate-limit resource category.
pub const HEADER_RATE_RESOURCE: &str = "x-ratelimit-resource";
/// Seconds to wait before retrying.
pub const HEADER_RETRY_AFTER: &str = "retry-after";
/// GitHub request ID.
pub const HEADER_REQUEST_ID: &str = "x-github-request-id";
/// Expiration of the token used for the request.
pub const HEADER_TOKEN_EXPIRATION: &str = "github-authentication-token-expiration";

/// Rate-limit snapshot taken from response headers.
///
/// Missing or malformed headers leave the matching field at zero / `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rate {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the window.
    pub remaining: u32,
    /// Requests already made in the window.
    pub used: u32,
    /// Time when the window resets.
    pub reset: Option<DateTime<Utc>>,
    /// Resource category (`core`, `search`, ...).
    pub resource: Option<String>,
}

impl Rate {
    /// Extracts the rate limit from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| header_str(headers, name).and_then(|v| v.trim().parse::<u32>().ok());

        Self {
            limit: number(HEADER_RATE_LIMIT).unwrap_or_default(),
            remaining: number(HEADER_RATE_REMAINING).unwrap_or_default(),
            used: number(HEADER_RATE_USED).unwrap_or_default(),
            reset: header_str(headers, HEADER_RATE_RESET)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            resource: header_str(headers, HEADER_RATE_RESOURCE).map(String::from),
        }
    }

    /// Returns true if no rate-limit headers were present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Envelope around one HTTP response.
///
/// Built once per call from the status and headers. Pagination and rate-limit
/// metadata are populated for successful and failed calls alike. The raw
/// body is only kept when the envelope travels inside an error.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    links: PaginationLinks,
    pages: PageInfo,
    rate: Rate,
    token_expiration: Option<DateTime<Utc>>,
    body: Bytes,
}

impl Response {
    /// Creates an envelope from a response status and headers.
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        let links = PaginationLinks::from_headers(&headers);
        let pages = PageInfo::from_links(&links);
        let rate = Rate::from_headers(&headers);
        let token_expiration = header_str(&headers, HEADER_TOKEN_EXPIRATION).and_then(parse_token_expiration);

        Self {
            status,
            headers,
            links,
            pages,
            rate,
            token_expiration,
            body: Bytes::new(),
        }
    }

    pub(crate) fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Gets the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Gets the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value as a string.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }

    /// Gets the raw pagination links.
    pub fn links(&self) -> &PaginationLinks {
        &self.links
    }

    /// Gets the decoded page numbers and tokens.
    pub fn pages(&self) -> &PageInfo {
        &self.pages
    }

    /// Gets the rate-limit snapshot.
    pub fn rate(&self) -> &Rate {
        &self.rate
    }

    /// Gets the expiration of the token used for this request.
    pub fn token_expiration(&self) -> Option<DateTime<Utc>> {
        self.token_expiration
    }

    /// Gets the GitHub request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.header_str(HEADER_REQUEST_ID)
    }

    /// Gets the raw body. Empty unless attached to an error.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// Seen as "2024-05-07 09:47:38 UTC" and "2024-05-07 09:47:38 -0700".
fn parse_token_expiration(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = value.strip_suffix(" UTC")?;
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}
