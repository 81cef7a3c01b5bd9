//! Tracing hooks for the dispatcher.

use crate::response::Rate;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument, trace, warn};
use url::Url;

/// Tracing hooks for GitHub API operations.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    #[instrument(skip(method, url))]
    pub fn on_request_start(method: &str, url: &str) {
        debug!(
            method = %method,
            url = %url,
            "GitHub API request started"
        );
    }

    /// Logs outbound headers with sensitive values redacted.
    pub fn on_request_headers(headers: &HeaderMap) {
        for (name, value) in headers {
            let value = value.to_str().unwrap_or("<binary>");
            trace!(
                header = %name,
                value = %redact_header(name.as_str(), value),
                "GitHub API request header"
            );
        }
    }

    /// Logs the completion of an API request.
    #[instrument(skip(method, url, status, duration))]
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        info!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a request error.
    #[instrument(skip(method, url, error))]
    pub fn on_request_error(method: &str, url: &str, error: &str) {
        error!(
            method = %method,
            url = %url,
            error = %error,
            "GitHub API request failed"
        );
    }

    /// Logs rate limit info.
    #[instrument(skip(rate))]
    pub fn on_rate_limit_update(rate: &Rate) {
        if rate.is_empty() {
            return;
        }
        debug!(
            limit = rate.limit,
            remaining = rate.remaining,
            used = rate.used,
            reset_at = ?rate.reset,
            resource = rate.resource.as_deref().unwrap_or("core"),
            "Rate limit updated"
        );
    }

    /// Logs rate limit exceeded.
    #[instrument(skip(rate, kind))]
    pub fn on_rate_limit_exceeded(kind: &str, rate: &Rate) {
        warn!(
            kind = %kind,
            limit = rate.limit,
            remaining = rate.remaining,
            reset_at = ?rate.reset,
            resource = rate.resource.as_deref().unwrap_or("core"),
            "Rate limit exceeded"
        );
    }
}

/// Sensitive headers that should be redacted in logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-github-token",
    "x-access-token",
    "cookie",
    "set-cookie",
];

/// Redacts sensitive values in headers.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// Replaces the value of a `client_secret` query parameter with `REDACTED`.
pub fn sanitize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    if !url.query_pairs().any(|(k, _)| k == "client_secret") {
        return raw.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "client_secret" {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}
