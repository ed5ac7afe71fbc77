//! Catchup progress state
//!
//! The single persisted record of catchup progress, with atomic writes and
//! advisory file locking so overlapping invocations fail fast instead of
//! clobbering each other's progress.

pub mod lock;
pub mod progress;

pub use lock::RunLock;
pub use progress::{CatchupStatus, ProgressState, StateError};
