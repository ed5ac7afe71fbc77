//! CLI error types and exit-code mapping

use crate::catchup::CatchupError;
use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::state::StateError;

/// Process exit codes, sysexits-flavoured so schedulers can branch on them
pub mod exit_code {
    /// Success, including the already-complete short-circuit
    pub const SUCCESS: i32 = 0;
    /// Fatal failure (missing state, corrupt data, malformed pagination)
    pub const FATAL: i32 = 1;
    /// Transient failure (rate limit, network); safe to retry automatically
    pub const TRANSIENT: i32 = 75;
    /// Authentication failure; must not be retried blindly by a scheduler
    pub const AUTHENTICATION: i32 = 77;
}

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State error
    #[error(transparent)]
    State(#[from] StateError),

    /// Fetcher error raised outside the controller (client construction)
    #[error(transparent)]
    Fetcher(#[from] FetcherError),

    /// Catchup run error
    #[error(transparent)]
    Catchup(#[from] CatchupError),
}

impl CliError {
    /// Whether the next scheduled invocation can simply retry
    pub fn is_transient(&self) -> bool {
        match self {
            CliError::Fetcher(e) => e.is_transient(),
            CliError::Catchup(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether this is a credential failure demanding operator action
    pub fn is_authentication(&self) -> bool {
        match self {
            CliError::Fetcher(e) => matches!(e, FetcherError::Authentication(_)),
            CliError::Catchup(e) => e.is_authentication(),
            _ => false,
        }
    }

    /// Map this error onto the process exit code
    pub fn exit_code(&self) -> i32 {
        if self.is_transient() {
            exit_code::TRANSIENT
        } else if self.is_authentication() {
            exit_code::AUTHENTICATION
        } else {
            exit_code::FATAL
        }
    }
}
