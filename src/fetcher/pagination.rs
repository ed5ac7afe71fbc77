//! Pagination metadata parsing
//!
//! Derives the total page count from a page response's navigation metadata.
//! Layered resolution:
//!
//! 1. RFC 5988 `Link` header, `rel="last"` target's `page` query parameter
//! 2. `X-Total-Count` header divided by the page size, rounded up
//! 3. Neither present: the current page is itself the last page
//!
//! Absence of a `rel="last"` relation is the terminal-page signal, a distinct
//! and valid state. Only metadata that is present but unparsable is an error.

use reqwest::header::HeaderMap;
use tracing::{debug, warn};
use url::Url;

/// Raw pagination metadata lifted from a page response's headers
#[derive(Debug, Clone, Default)]
pub struct PaginationHints {
    /// Raw `Link` header value, if the response carried one
    pub link: Option<String>,
    /// Parsed `X-Total-Count` header value, if present and numeric
    pub total_count: Option<u64>,
}

impl PaginationHints {
    /// Extract pagination hints from response headers
    ///
    /// Header lookup is case-insensitive (`HeaderMap` normalizes names). An
    /// `X-Total-Count` value that is present but non-numeric is dropped with
    /// a warning rather than treated as fatal, since the `Link` header is the
    /// primary source anyway.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let link = headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let total_count = headers
            .get("X-Total-Count")
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| match raw.parse::<u64>() {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(value = raw, error = %e, "ignoring invalid X-Total-Count header");
                    None
                }
            });

        Self { link, total_count }
    }

    /// Resolve the last page number for a response fetched as `page_number`
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::Malformed`] only when a `rel="last"` link
    /// exists but its target URL or `page` parameter cannot be parsed.
    pub fn last_page(&self, page_number: u32, per_page: u32) -> Result<u32, PaginationError> {
        if let Some(link) = &self.link {
            if let Some(last) = last_page_from_link(link)? {
                debug!(last_page = last, "total pages determined from Link header");
                return Ok(last);
            }
        }

        if let Some(total) = self.total_count {
            let last = pages_from_total_count(total, per_page);
            debug!(
                last_page = last,
                total_count = total,
                per_page,
                "total pages calculated from X-Total-Count"
            );
            return Ok(last);
        }

        // No "last" relation and no count: this page is the final page.
        debug!(page_number, "no pagination metadata; current page is the last");
        Ok(page_number)
    }
}

/// Parse a `Link` header and return the page number of the `rel="last"`
/// target, or `None` when the header carries no such relation
///
/// Example header:
/// `<https://api.freeagent.com/v2/invoices?page=2>; rel="next",
///  <https://api.freeagent.com/v2/invoices?page=1860>; rel="last"`
pub fn last_page_from_link(header: &str) -> Result<Option<u32>, PaginationError> {
    for entry in header.split(',') {
        let entry = entry.trim();
        let mut sections = entry.split(';');
        let target = sections.next().unwrap_or("").trim();

        let is_last = sections.any(|param| {
            let param = param.trim();
            param == r#"rel="last""# || param == "rel=last"
        });
        if !is_last {
            continue;
        }

        let target = target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .ok_or_else(|| {
                PaginationError::Malformed(format!("link target not angle-bracketed: {entry}"))
            })?;

        let url = Url::parse(target).map_err(|e| {
            PaginationError::Malformed(format!("invalid rel=\"last\" URL {target}: {e}"))
        })?;

        let page = url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                PaginationError::Malformed(format!(
                    "rel=\"last\" URL has no page parameter: {target}"
                ))
            })?;

        let page: u32 = page.parse().map_err(|e| {
            PaginationError::Malformed(format!("invalid page number {page:?} in Link header: {e}"))
        })?;
        return Ok(Some(page));
    }

    Ok(None)
}

/// Calculate a page count from a total record count, rounding up
///
/// Returns at least 1 page; a collection with zero records is one empty page.
pub fn pages_from_total_count(total_count: u64, per_page: u32) -> u32 {
    if per_page == 0 || total_count == 0 {
        return 1;
    }
    total_count.div_ceil(per_page as u64) as u32
}

/// Errors related to pagination metadata
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    /// Metadata is present but cannot be parsed; fatal to this run only
    #[error("malformed pagination metadata: {0}")]
    Malformed(String),
}
