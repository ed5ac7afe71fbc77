//! Main entry point for the freeagent-cache CLI

use clap::Parser;
use freeagent_cache::cli::Cli;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("freeagent_cache=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = cli.execute().await {
        // Distinct log lines per failure class so alerting can tell a
        // retriable hiccup from a dead credential.
        if e.is_transient() {
            warn!(error = %e, "transient failure, will retry on the next scheduled run");
        } else if e.is_authentication() {
            error!(error = %e, "authentication failure, operator intervention required");
        } else {
            error!(error = %e, "run failed");
        }
        std::process::exit(e.exit_code());
    }
}
