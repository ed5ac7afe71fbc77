//! Catchup orchestration
//!
//! The controller drives the per-invocation state machine:
//! `NOT_STARTED` → `IN_PROGRESS` → `COMPLETE` (terminal), one page per run.

pub mod controller;

pub use controller::{CatchupController, RunOutcome, RunReport};

use crate::fetcher::{FetcherError, PaginationError};
use crate::state::StateError;

/// Errors that can abort a catchup invocation
///
/// All of these occur before the state mutation point, so the state file
/// always reflects a fully-processed page boundary.
#[derive(Debug, thiserror::Error)]
pub enum CatchupError {
    /// State load/save error
    #[error(transparent)]
    State(#[from] StateError),

    /// Page fetch error
    #[error(transparent)]
    Fetcher(#[from] FetcherError),

    /// Pagination metadata error
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl CatchupError {
    /// Whether the next scheduled invocation can simply retry this run
    pub fn is_transient(&self) -> bool {
        matches!(self, CatchupError::Fetcher(e) if e.is_transient())
    }

    /// Whether this is a credential failure demanding operator action
    pub fn is_authentication(&self) -> bool {
        matches!(self, CatchupError::Fetcher(FetcherError::Authentication(_)))
    }
}
