//! Ledger inspection commands.

use super::commands::LedgerCommands;
use tagrelay::{Ledger, RelayConfig, RelayResult};

/// Handle `ledger` subcommands.
pub fn handle_ledger_command(config: &RelayConfig, cmd: LedgerCommands) -> RelayResult<()> {
    let ledger = Ledger::load(config.ledger().path())?;

    match cmd {
        LedgerCommands::Count => {
            println!("{} download(s) recorded in {}", ledger.len(), ledger.path().display());
        }
        LedgerCommands::List { tag, limit } => {
            let records: Vec<_> = ledger
                .records()?
                .into_iter()
                .filter(|r| tag.as_deref().is_none_or(|t| r.tag() == t))
                .collect();
            let skip = records.len().saturating_sub(limit);

            if records.is_empty() {
                println!("No downloads recorded");
                return Ok(());
            }
            println!("{:<20} {:<24} {:<26} FILE", "TAG", "ID", "DOWNLOADED");
            for record in records.iter().skip(skip) {
                println!(
                    "{:<20} {:<24} {:<26} {}",
                    record.tag(),
                    record.id(),
                    record.downloaded_at().to_rfc3339(),
                    record.local_path().display()
                );
            }
        }
    }

    Ok(())
}
