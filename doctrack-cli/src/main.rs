//! doctrack CLI - typed fields for tracked documents.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error, or the supplied values failed validation

use clap::Parser;
use tracing_subscriber::EnvFilter;

use doctrack::{commands, Cli, CliOverrides, DoctrackConfig};

/// Filter used by `--debug`.
const DEBUG_FILTER: &str = "doctrack=debug,doctrack_fields=debug,doctrack_store=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        database_path: cli.database.clone(),
        schema_dir: cli.schema_dir.clone(),
    };
    let config = match DoctrackConfig::load(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let filter = if cli.debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match commands::run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}
