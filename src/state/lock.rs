//! Run lock for serializing invocations
//!
//! Advisory file locking using fd-lock. Two invocations racing on the same
//! state file would silently clobber each other's progress on save, so the
//! whole load-fetch-persist-save sequence runs under an exclusive lock and a
//! second invocation fails fast.

use super::progress::StateError;
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive lock held for the duration of one invocation
pub struct RunLock {
    _lock: RwLock<File>,
}

impl RunLock {
    /// Try to acquire the run lock without blocking
    ///
    /// The lock file lives next to the state file, at the state path with a
    /// `.lock` extension. Returns [`StateError::Lock`] immediately if another
    /// invocation holds the lock.
    pub fn try_acquire(state_path: &Path) -> Result<Self, StateError> {
        if let Some(parent) = state_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StateError::Io(e.to_string()))?;
            }
        }

        let lock_path = state_path.with_extension("lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StateError::Lock(format!("failed to open lock file: {e}")))?;

        let mut lock = RwLock::new(file);
        let guard = lock.try_write().map_err(|e| {
            StateError::Lock(format!(
                "another invocation appears to be running (lock held): {e}"
            ))
        })?;

        // The guard is forgotten rather than dropped: the flock stays held
        // until the file handle inside the RwLock is closed on drop of
        // RunLock, which outlives the invocation's state mutations.
        std::mem::forget(guard);

        Ok(Self { _lock: lock })
    }
}
