//! Idempotent item persistence
//!
//! One file per `(kind, id)` under the cache root:
//! `invoices/invoice_{id}.json` and `credit_notes/credit_note_{id}.json`.
//! A file that already exists is never touched again, which is what makes
//! refetching a page after a crash safe.

use super::{OutputError, OutputResult};
use crate::identity::ItemIdentity;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of a single persist call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// A new file was created for this identity
    Written,
    /// A file already existed; it was left untouched
    Skipped,
}

/// Content-addressed store for fetched items
pub struct ItemCache {
    root: PathBuf,
}

impl ItemCache {
    /// Create a cache rooted at `root` (e.g. `data`)
    ///
    /// Directories are created lazily on first write, not here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Canonical path for an identity
    ///
    /// # Examples
    ///
    /// ```
    /// use freeagent_cache::identity::ItemIdentity;
    /// use freeagent_cache::output::ItemCache;
    /// use std::path::Path;
    ///
    /// let cache = ItemCache::new("data");
    /// let id = ItemIdentity::from_url("https://api.freeagent.com/v2/invoices/694948").unwrap();
    /// assert_eq!(cache.item_path(&id), Path::new("data/invoices/invoice_694948.json"));
    /// ```
    pub fn item_path(&self, identity: &ItemIdentity) -> PathBuf {
        self.root
            .join(identity.kind().directory())
            .join(identity.file_name())
    }

    /// Write the payload for `identity` if no file exists yet
    ///
    /// Returns [`PersistOutcome::Skipped`] without touching the file when one
    /// already exists; this is the idempotence guarantee that makes repeated
    /// runs over the same page safe. Otherwise the payload is written
    /// verbatim (pretty-printed JSON) and [`PersistOutcome::Written`] is
    /// returned.
    pub fn persist(
        &self,
        identity: &ItemIdentity,
        payload: &Value,
    ) -> OutputResult<PersistOutcome> {
        let path = self.item_path(identity);

        if path.exists() {
            debug!(item = %identity, "already cached, skipping");
            return Ok(PersistOutcome::Skipped);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::Io(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(payload)
            .map_err(|e| OutputError::Serialization(e.to_string()))?;
        std::fs::write(&path, json)
            .map_err(|e| OutputError::Io(format!("failed to write {}: {e}", path.display())))?;

        debug!(path = %path.display(), "item cached");
        Ok(PersistOutcome::Written)
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}
