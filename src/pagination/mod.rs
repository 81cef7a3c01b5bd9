//! Pagination handling for GitHub API.
//!
//! Outbound, list options are appended to the request URL as query
//! parameters. Inbound, the `Link` header is decoded into raw URLs
//! ([`PaginationLinks`]) and page numbers / tokens ([`PageInfo`]).

use crate::errors::{GitHubError, GitHubResult};
use reqwest::header::{HeaderMap, LINK};
use serde::{Deserialize, Serialize};
use url::Url;

/// Page-number pagination options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    /// Page number (1-indexed).
    #[serde(skip_serializing_if = "is_unset")]
    pub page: Option<u32>,
    /// Items per page (max 100).
    #[serde(skip_serializing_if = "is_unset")]
    pub per_page: Option<u32>,
}

impl ListOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets items per page.
    pub fn per_page(mut self, per_page: u32) -> Self {
        // GitHub API limits to 100
        self.per_page = Some(per_page.min(100));
        self
    }
}

/// Cursor pagination options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListCursorOptions {
    /// Page token, for endpoints that use opaque page identifiers.
    #[serde(skip_serializing_if = "is_blank")]
    pub page: Option<String>,
    /// Items per page (max 100).
    #[serde(skip_serializing_if = "is_unset")]
    pub per_page: Option<u32>,
    /// Return results after this cursor.
    #[serde(skip_serializing_if = "is_blank")]
    pub after: Option<String>,
    /// Return results before this cursor.
    #[serde(skip_serializing_if = "is_blank")]
    pub before: Option<String>,
    /// Cursor returned by a previous response.
    #[serde(skip_serializing_if = "is_blank")]
    pub cursor: Option<String>,
}

impl ListCursorOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets items per page.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page.min(100));
        self
    }

    /// Continues after the given cursor.
    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    /// Continues before the given cursor.
    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    /// Sets the cursor.
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

fn is_unset(value: &Option<u32>) -> bool {
    matches!(value, None | Some(0))
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Appends the set fields of `opts` to the query of `url`.
///
/// Existing query parameters are preserved. `None` leaves the URL untouched.
/// Values that do not encode as flat key/value pairs are rejected.
pub fn add_options<O: Serialize + ?Sized>(url: &mut Url, opts: Option<&O>) -> GitHubResult<()> {
    let Some(opts) = opts else {
        return Ok(());
    };

    let encoded = serde_urlencoded::to_string(opts)
        .map_err(|e| GitHubError::construction_with_source("Failed to encode query options", e))?;
    if encoded.is_empty() {
        return Ok(());
    }

    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect();
    url.query_pairs_mut().extend_pairs(pairs);
    Ok(())
}

/// Pagination links parsed from Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the previous page.
    pub prev: Option<String>,
    /// URL for the first page.
    pub first: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses pagination links from the Link header (RFC 8288).
    ///
    /// A link without a `<url>` part or a `rel` is skipped; the others still decode.
    pub fn from_header(header_value: &str) -> Self {
        let mut links = Self::default();

        for part in header_value.split(',') {
            let mut url = None;
            let mut rel = None;

            for segment in part.split(';') {
                let segment = segment.trim();
                if segment.len() >= 2 && segment.starts_with('<') && segment.ends_with('>') {
                    url = Some(segment[1..segment.len() - 1].to_string());
                } else if let Some(value) = segment.strip_prefix("rel=") {
                    rel = Some(value.trim_matches('"').to_string());
                }
            }

            if let (Some(url), Some(rel)) = (url, rel) {
                match rel.as_str() {
                    "next" => links.next = Some(url),
                    "prev" => links.prev = Some(url),
                    "first" => links.first = Some(url),
                    "last" => links.last = Some(url),
                    _ => {}
                }
            }
        }

        links
    }

    /// Parses pagination links from every `Link` header line in `headers`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let joined = headers
            .get_all(LINK)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        Self::from_header(&joined)
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Returns true if there is a previous page.
    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }

    /// Gets the total page count from the last link.
    pub fn total_pages(&self) -> Option<u32> {
        self.last.as_deref().and_then(extract_page_number)
    }
}

/// Page numbers and tokens decoded from pagination links.
///
/// `None` means the response has no such page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Next page number.
    pub next_page: Option<u32>,
    /// Previous page number.
    pub prev_page: Option<u32>,
    /// First page number.
    pub first_page: Option<u32>,
    /// Last page number.
    pub last_page: Option<u32>,
    /// Opaque next page token, when the next page is not numeric.
    pub next_page_token: Option<String>,
    /// Cursor for the next page.
    pub cursor: Option<String>,
    /// `before` cursor of the previous page.
    pub before: Option<String>,
    /// `after` cursor of the next page.
    pub after: Option<String>,
}

impl PageInfo {
    /// Decodes page numbers and tokens from parsed links.
    pub fn from_links(links: &PaginationLinks) -> Self {
        let mut info = Self::default();

        if let Some(query) = links.next.as_deref().and_then(LinkQuery::parse) {
            if query.cursor.is_some() {
                info.cursor = query.cursor;
            } else {
                if let Some(page) = query.page {
                    match page.parse() {
                        Ok(number) => info.next_page = Some(number),
                        Err(_) => info.next_page_token = Some(page),
                    }
                }
                info.after = query.after;
            }
        }

        if let Some(query) = links.prev.as_deref().and_then(LinkQuery::parse) {
            if query.cursor.is_none() {
                info.prev_page = query.page.and_then(|p| p.parse().ok());
                info.before = query.before;
            }
        }

        info.first_page = links
            .first
            .as_deref()
            .and_then(LinkQuery::parse)
            .filter(|q| q.cursor.is_none())
            .and_then(|q| q.page)
            .and_then(|p| p.parse().ok());

        info.last_page = links
            .last
            .as_deref()
            .and_then(LinkQuery::parse)
            .filter(|q| q.cursor.is_none())
            .and_then(|q| q.page)
            .and_then(|p| p.parse().ok());

        info
    }

    /// Returns true if any kind of next-page pointer is present.
    pub fn has_next(&self) -> bool {
        self.next_page.is_some()
            || self.next_page_token.is_some()
            || self.cursor.is_some()
            || self.after.is_some()
    }
}

/// Pagination parameters found in one link URL.
struct LinkQuery {
    page: Option<String>,
    cursor: Option<String>,
    before: Option<String>,
    after: Option<String>,
}

impl LinkQuery {
    fn parse(link: &str) -> Option<Self> {
        let url = Url::parse(link).ok()?;
        let get = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };

        Some(Self {
            // `since` acts as the page marker on endpoints such as /users
            page: get("page").or_else(|| get("since")),
            cursor: get("cursor"),
            before: get("before"),
            after: get("after"),
        })
    }
}

/// Response wrapper for paginated lists with total count.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    /// Total count of items.
    pub total_count: u64,
    /// Whether results are incomplete (for search).
    #[serde(default)]
    pub incomplete_results: bool,
    /// The items.
    pub items: Vec<T>,
}

/// Extracts page number from a URL.
pub fn extract_page_number(url: &str) -> Option<u32> {
    Url::parse(url).ok().and_then(|u| {
        u.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    })
}
