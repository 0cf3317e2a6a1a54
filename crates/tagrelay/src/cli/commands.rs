//! CLI command definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tagrelay::MediaKind;

/// Tagrelay - fetch new hashtag media and relay it to the destination service
#[derive(Parser, Debug)]
#[command(name = "tagrelay")]
#[command(about = "Fetch new hashtag media and relay it to the destination service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Use this configuration file instead of the layered defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download new media for a list of hashtags
    Fetch(FetchArgs),

    /// Upload local files to the destination service
    Upload(UploadArgs),

    /// Fetch, then upload everything that was downloaded
    Run(RunArgs),

    /// Inspect the download ledger
    #[command(subcommand)]
    Ledger(LedgerCommands),
}

/// Options shared by `fetch` and `run`
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Comma-separated hashtags, e.g. "sunrise,beach"
    #[arg(short, long)]
    pub tags: String,

    /// New items to download per tag
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_items: u32,

    /// Kind of media to download
    #[arg(short, long, value_enum, default_value_t = KindArg::Video)]
    pub kind: KindArg,
}

/// Options for `upload`
#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Files to upload
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub target: UploadTarget,
}

/// Destination options shared by `upload` and `run`
#[derive(Args, Debug, Clone)]
pub struct UploadTarget {
    /// Destination category (defaults to the configured category)
    #[arg(long)]
    pub category_id: Option<u32>,

    /// Attempts per file (defaults to the configured value)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: Option<u32>,
}

/// Options for `run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub target: UploadTarget,
}

/// Ledger subcommands
#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// Print the number of recorded downloads
    Count,

    /// List recorded downloads, newest last
    List {
        /// Only show rows for this hashtag
        #[arg(long)]
        tag: Option<String>,

        /// Maximum number of rows to display
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

/// Media kind options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    /// Still images
    Image,
    /// Video clips
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => MediaKind::Image,
            KindArg::Video => MediaKind::Video,
        }
    }
}
