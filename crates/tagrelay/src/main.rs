//! Tagrelay CLI binary.
//!
//! This binary provides command-line access to the pipeline:
//! - Fetch new media for a list of hashtags
//! - Upload local files to the destination service
//! - Run both stages back to back
//! - Inspect the download ledger

use clap::Parser;
use tagrelay::{LoggingConfig, RelayConfig, init_logging};
use tokio::sync::watch;
use tracing::warn;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, handle_fetch, handle_ledger_command, handle_run, handle_upload};

    // Credentials may live in a .env file next to the working directory
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _log_guard = init_logging(
        &LoggingConfig::new()
            .with_verbose(cli.verbose)
            .with_json_logs(cli.json_logs)
            .with_log_file(cli.log_file.clone()),
    )?;

    let config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)?,
        None => RelayConfig::load()?,
    };

    // Ctrl-C stops work between tags and before uploads
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            let _ = cancel_tx.send(true);
        }
    });

    match cli.command {
        Commands::Fetch(args) => handle_fetch(&config, &args, cancel_rx).await?,
        Commands::Upload(args) => handle_upload(&config, &args).await?,
        Commands::Run(args) => handle_run(&config, &args, cancel_rx).await?,
        Commands::Ledger(ledger_cmd) => handle_ledger_command(&config, ledger_cmd)?,
    }

    Ok(())
}
