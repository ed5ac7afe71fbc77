//! Progress state persistence
//!
//! Implements atomic state writes: the record is written to a temp file in
//! the same directory, synced, then renamed over the canonical path, so a
//! reader never observes a partially written record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Catchup sweep status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchupStatus {
    /// State has been initialised but no page has been fetched yet
    NotStarted,
    /// At least one page has been processed; more remain
    InProgress,
    /// The last page has been processed; terminal
    Complete,
}

/// The single persisted record of catchup progress
///
/// This record is the sole source of truth for resumability; no other file
/// carries progress information. It is mutated only by the catchup
/// controller, once per invocation, after all item-level work for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Sweep status
    pub status: CatchupStatus,
    /// Last page successfully and fully processed
    pub current_page: u32,
    /// Most recent known total page count; advisory, refreshed every run
    pub total_pages: u32,
    /// Page size, fixed for the life of a catchup sweep
    ///
    /// Defaults to 0 when absent so records written before this field
    /// existed still load; [`ProgressState::reconcile_per_page`] fills it in
    /// from config.
    #[serde(default)]
    pub per_page: u32,
    /// Timestamp of the most recent completed invocation
    pub last_run: Option<DateTime<Utc>>,
    /// Set exactly once, when `status` transitions to `Complete`
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressState {
    /// Create a fresh record and persist it, overwriting any prior record
    ///
    /// This is the explicit, operator-invoked reset path; it never runs
    /// implicitly.
    pub fn initialise(path: &Path, per_page: u32) -> Result<Self, StateError> {
        let state = Self {
            status: CatchupStatus::NotStarted,
            current_page: 0,
            total_pages: 0,
            per_page,
            last_run: None,
            completed_at: None,
        };
        state.save(path)?;
        info!(
            path = %path.display(),
            per_page,
            "state initialised with current_page=0"
        );
        Ok(state)
    }

    /// Load the record from `path`
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Missing`] when no record exists: a fresh catchup
    /// sweep must be started explicitly via `init`, never by accident.
    /// Returns [`StateError::Corrupt`] when the file exists but cannot be
    /// parsed or violates the record's invariants.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Err(StateError::Missing {
                path: path.to_path_buf(),
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| StateError::Io(e.to_string()))?;
        let state: ProgressState = serde_json::from_str(&contents).map_err(|e| {
            warn!(error = %e, "failed to deserialize progress state");
            StateError::Corrupt(e.to_string())
        })?;
        state.validate()?;

        debug!(
            status = ?state.status,
            current_page = state.current_page,
            total_pages = state.total_pages,
            "progress state loaded"
        );
        Ok(state)
    }

    /// Save the record to `path`, atomically with respect to process crash
    ///
    /// Writes to a `tempfile::NamedTempFile` in the same directory, flushes
    /// and syncs it, then renames it over the canonical path. The parent
    /// directory is fsynced afterwards so the rename itself is durable.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StateError::Io(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let parent_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| StateError::Io(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StateError::Io(format!("failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| StateError::Io(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StateError::Io(format!("failed to sync temp file: {e}")))?;

        temp_file
            .persist(path)
            .map_err(|e| StateError::Io(format!("failed to persist temp file: {e}")))?;

        if let Ok(dir) = std::fs::File::open(parent_dir) {
            let _ = dir.sync_all();
        }

        debug!(
            path = %path.display(),
            current_page = self.current_page,
            total_pages = self.total_pages,
            "progress state saved"
        );
        Ok(())
    }

    /// Whether the catchup sweep has finished
    pub fn is_complete(&self) -> bool {
        self.status == CatchupStatus::Complete
    }

    /// Fill in or cross-check `per_page` against the configured value
    ///
    /// Records written before `per_page` was persisted load with 0; those
    /// take the config value. When the state carries a different value than
    /// config, the state value wins for the remainder of the sweep and a
    /// warning is logged (changing page size mid-sweep would shift page
    /// boundaries and skip or repeat items).
    ///
    /// Returns `true` when the record was changed and should be re-saved.
    pub fn reconcile_per_page(&mut self, config_per_page: u32) -> bool {
        if self.per_page == 0 {
            warn!(
                per_page = config_per_page,
                "state missing per_page, adopting value from config"
            );
            self.per_page = config_per_page;
            return true;
        }
        if self.per_page != config_per_page {
            warn!(
                state_per_page = self.per_page,
                config_per_page,
                "config per_page differs from state; keeping state value. \
                 Re-run `init` to change the page size"
            );
        }
        false
    }

    fn validate(&self) -> Result<(), StateError> {
        if self.total_pages > 0 && self.current_page > self.total_pages {
            return Err(StateError::Corrupt(format!(
                "current_page {} exceeds total_pages {}",
                self.current_page, self.total_pages
            )));
        }
        match (self.status, self.completed_at.is_some()) {
            (CatchupStatus::Complete, false) => Err(StateError::Corrupt(
                "status is complete but completed_at is null".to_string(),
            )),
            (CatchupStatus::NotStarted | CatchupStatus::InProgress, true) => {
                Err(StateError::Corrupt(
                    "completed_at is set but status is not complete".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Errors related to progress state persistence
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// No state record exists; the operator must run `init` first
    #[error("state file {path} not found; run `freeagent-cache init` first")]
    Missing {
        /// Expected state file path
        path: PathBuf,
    },

    /// State file exists but cannot be parsed or violates invariants
    #[error("state file is corrupt: {0}")]
    Corrupt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}
