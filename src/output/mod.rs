//! Local item cache
//!
//! Content-addressed JSON files, one per invoice or credit note, written
//! exactly once.

pub mod cache;

pub use cache::{ItemCache, PersistOutcome};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Payload could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
