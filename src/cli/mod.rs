//! CLI command implementations

pub mod error;
pub mod run;

pub use error::{exit_code, CliError};
pub use run::{Cli, Commands};
