//! Command-line surface
//!
//! Two operating modes: the default `run` fetches and caches one page of the
//! catchup sweep; `init` resets the state file. Both take the whole
//! invocation under the run lock so overlapping invocations fail fast.

use super::CliError;
use crate::catchup::{CatchupController, RunOutcome};
use crate::config::Config;
use crate::fetcher::FreeAgentClient;
use crate::output::ItemCache;
use crate::state::{ProgressState, RunLock};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Incrementally mirror FreeAgent invoices and credit notes into a local
/// JSON cache, one page per invocation
#[derive(Parser, Debug)]
#[command(name = "freeagent-cache", version)]
pub struct Cli {
    /// Command to execute; defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the API configuration file
    #[arg(long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Path to the catchup state file
    #[arg(long, global = true, default_value = "state.json")]
    pub state_file: PathBuf,

    /// Root directory for cached invoice and credit note files
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and cache the next page of the catchup sweep (default)
    Run,
    /// Create a fresh state file, resetting any existing catchup progress
    Init,
}

impl Cli {
    /// Execute the selected command
    pub async fn execute(&self) -> Result<(), CliError> {
        match self.command.as_ref().unwrap_or(&Commands::Run) {
            Commands::Init => self.initialise(),
            Commands::Run => self.run().await,
        }
    }

    /// Explicit, operator-invoked reset of the catchup state
    fn initialise(&self) -> Result<(), CliError> {
        let config = Config::load(&self.config)?;
        let _lock = RunLock::try_acquire(&self.state_file)?;
        ProgressState::initialise(&self.state_file, config.per_page)?;
        Ok(())
    }

    /// One catchup invocation: load, fetch one page, persist, save
    async fn run(&self) -> Result<(), CliError> {
        let config = Config::load(&self.config)?;

        // Held across the whole load-fetch-persist-save sequence.
        let _lock = RunLock::try_acquire(&self.state_file)?;

        let mut state = ProgressState::load(&self.state_file)?;
        if state.reconcile_per_page(config.per_page) {
            state.save(&self.state_file)?;
        }

        let cache = ItemCache::new(&self.data_dir);
        let fetcher = FreeAgentClient::new(config, self.config.clone())?;
        let controller = CatchupController::new(&fetcher, &cache, &self.state_file);

        let (_, outcome) = controller.run_once(state).await?;
        if let RunOutcome::PageProcessed(report) = outcome {
            info!(
                page = report.page,
                total_pages = report.total_pages,
                written = report.written,
                skipped = report.skipped,
                failed = report.failed,
                complete = report.complete,
                "run finished"
            );
        }
        Ok(())
    }
}
