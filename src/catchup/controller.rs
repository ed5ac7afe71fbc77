//! The per-invocation catchup state machine
//!
//! One invocation processes at most one page: short-circuit if the sweep is
//! already complete, fetch `current_page + 1`, persist each item
//! idempotently, then advance and save the progress record in a single
//! mutation at the end. A crash anywhere before that save leaves
//! `current_page` unadvanced, so the page is refetched and re-persisted
//! (idempotently) on the next run.

use super::CatchupError;
use crate::identity::ItemIdentity;
use crate::output::{ItemCache, PersistOutcome};
use crate::state::{CatchupStatus, ProgressState};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The sweep was already complete; no network call was made
    AlreadyComplete,
    /// One page was fetched and processed
    PageProcessed(RunReport),
}

/// Summary of one processed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The page that was processed
    pub page: u32,
    /// Last page number derived from the response metadata
    pub total_pages: u32,
    /// Items newly written to the cache
    pub written: usize,
    /// Items already present, left untouched
    pub skipped: usize,
    /// Items that failed identity resolution or the write itself
    pub failed: usize,
    /// Whether this page completed the sweep
    pub complete: bool,
}

/// The orchestrating state machine
///
/// Owns nothing durable itself: the fetcher, cache, and state path are
/// injected, and the progress record is passed through
/// [`CatchupController::run_once`] by value.
pub struct CatchupController<'a> {
    fetcher: &'a dyn crate::fetcher::PageFetcher,
    cache: &'a ItemCache,
    state_path: &'a Path,
}

impl<'a> CatchupController<'a> {
    /// Create a controller over the given collaborators
    pub fn new(
        fetcher: &'a dyn crate::fetcher::PageFetcher,
        cache: &'a ItemCache,
        state_path: &'a Path,
    ) -> Self {
        Self {
            fetcher,
            cache,
            state_path,
        }
    }

    /// Execute one invocation of the catchup sweep
    ///
    /// Returns the updated state together with the outcome. Fetch and
    /// pagination failures abort before any state mutation; per-item
    /// failures are logged as warnings and the page still advances.
    pub async fn run_once(
        &self,
        mut state: ProgressState,
    ) -> Result<(ProgressState, RunOutcome), CatchupError> {
        if state.is_complete() {
            info!(
                completed_at = ?state.completed_at,
                "catchup already complete, nothing to do"
            );
            return Ok((state, RunOutcome::AlreadyComplete));
        }

        let next_page = state.current_page + 1;
        info!(page = next_page, "processing page");

        let page = self.fetcher.fetch_page(next_page, state.per_page).await?;
        let reported_last = page.pagination.last_page(page.page_number, state.per_page)?;

        // The remote total can shrink between runs (items deleted upstream).
        // Progress never moves backwards, so a reported last page below the
        // one just fetched is clamped: this page becomes the final one and
        // the saved record keeps current_page <= total_pages.
        let total_pages = if reported_last < next_page {
            warn!(
                reported_last,
                page = next_page,
                "remote reports fewer pages than already processed, treating this page as the last"
            );
            next_page
        } else {
            reported_last
        };

        info!(
            page = next_page,
            total_pages,
            progress = %format_progress(next_page, total_pages),
            items = page.items.len(),
            "page fetched"
        );

        let mut written = 0;
        let mut skipped = 0;
        // Items the transport dropped while parsing the body count as
        // failures too, so the report reflects every item on the page.
        let mut failed = page.malformed;
        for item in &page.items {
            let identity = match ItemIdentity::from_url(&item.self_url) {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(url = %item.self_url, error = %e, "skipping unresolvable item");
                    failed += 1;
                    continue;
                }
            };
            match self.cache.persist(&identity, &item.payload) {
                Ok(PersistOutcome::Written) => written += 1,
                Ok(PersistOutcome::Skipped) => skipped += 1,
                Err(e) => {
                    warn!(item = %identity, error = %e, "failed to cache item");
                    failed += 1;
                }
            }
        }

        let now = Utc::now();
        state.current_page = next_page;
        state.total_pages = total_pages;
        state.last_run = Some(now);

        let complete = next_page >= total_pages;
        if complete {
            state.status = CatchupStatus::Complete;
            state.completed_at = Some(now);
            info!(pages = next_page, "catchup complete");
        } else {
            state.status = CatchupStatus::InProgress;
        }

        // The only state mutation point: everything item-level has already
        // happened, so a crash before this line re-runs the page harmlessly.
        state.save(self.state_path)?;

        info!(written, skipped, failed, "page processed, state saved");
        Ok((
            state,
            RunOutcome::PageProcessed(RunReport {
                page: next_page,
                total_pages,
                written,
                skipped,
                failed,
                complete,
            }),
        ))
    }
}

/// Render progress as a percentage string, e.g. `8.06%`
fn format_progress(current: u32, total: u32) -> String {
    if total == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (current as f64 / total as f64) * 100.0)
}
