//! Remote collection fetching
//!
//! The [`PageFetcher`] trait is the seam between the catchup controller and
//! the HTTP transport: the controller only ever asks for "page N at size P"
//! and branches on the error kind of the result.

use crate::fetcher::pagination::PaginationHints;
use async_trait::async_trait;
use serde_json::Value;

pub mod freeagent_http;
pub mod pagination;

pub use freeagent_http::FreeAgentClient;
pub use pagination::PaginationError;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Credential rejected; fatal, requires operator intervention
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Remote throttling; transient, safe to retry on the next cycle
    #[error("rate limited by the remote API")]
    RateLimited,

    /// Generic network failure (timeout, connection refused); transient
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected HTTP status; fatal to this run
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be parsed; fatal to this run
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetcherError {
    /// Whether the failure is transient and the run can simply be retried
    /// wholesale by the next scheduled invocation
    pub fn is_transient(&self) -> bool {
        matches!(self, FetcherError::RateLimited | FetcherError::Network(_))
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// A fetched invoice or credit note
///
/// The payload is the full item as returned by the API, held verbatim; only
/// `self_url` is interpreted, to derive the item's `(kind, id)` identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteItem {
    /// Absolute URL identifying the item and its collection kind
    pub self_url: String,
    /// Opaque structured record, persisted verbatim
    pub payload: Value,
}

/// Response to one page fetch
#[derive(Debug, Clone)]
pub struct PageResult {
    /// The page number that was requested
    pub page_number: u32,
    /// Items on this page, at most `per_page` of them
    pub items: Vec<RemoteItem>,
    /// Items dropped while parsing the page body (e.g. missing `url` field)
    pub malformed: usize,
    /// Raw pagination metadata from the response headers
    pub pagination: PaginationHints,
}

/// Transport collaborator: fetches exactly one page of the remote collection
///
/// Implementations must attach whatever authentication the remote service
/// requires. The controller treats this as an opaque function returning
/// either a page or a kind-tagged failure.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch page `page` of the collection at size `per_page`
    async fn fetch_page(&self, page: u32, per_page: u32) -> FetcherResult<PageResult>;
}
