//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the tagrelay binary.

mod commands;
mod fetch;
mod ledger;
mod progress;
mod run;
mod upload;

pub use commands::{Cli, Commands};
pub use fetch::handle_fetch;
pub use ledger::handle_ledger_command;
pub use run::handle_run;
pub use upload::handle_upload;
