//! Tagrelay - hashtag media relay
//!
//! Tagrelay discovers media posted under hashtags through a third-party
//! search API, downloads images or videos it has not seen before, and
//! re-uploads the downloaded files to a destination service through a
//! signed-URL upload protocol.
//!
//! # Architecture
//!
//! Tagrelay is organized as a workspace with focused crates:
//!
//! - `tagrelay_error` - Error types
//! - `tagrelay_ledger` - Append-only download ledger for deduplication
//! - `tagrelay_retry` - Retry with exponential backoff
//! - `tagrelay_fetch` - Hashtag search client and media fetcher
//! - `tagrelay_upload` - Three-phase upload client
//!
//! This crate (`tagrelay`) re-exports everything for convenience and adds
//! layered configuration, logging setup and the [`Pipeline`] orchestrator.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tagrelay::{Pipeline, RelayConfig, RunRequest, SearchCredentials, UploadCredentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::load()?;
//!     let fetcher = tagrelay::build_fetcher(&config, SearchCredentials::from_env()?)?;
//!     let uploader = tagrelay::build_uploader(&config, UploadCredentials::from_env()?)?;
//!
//!     let request = RunRequest::builder()
//!         .tags(vec!["sunrise".to_string()])
//!         .max_items(3_usize)
//!         .build()?;
//!     let report = Pipeline::new(fetcher).with_uploader(uploader).run(&request).await?;
//!     println!("{}", report.upload_summary());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod logging;
mod pipeline;

pub use config::{LedgerConfig, RelayConfig};
pub use logging::{LoggingConfig, init_logging};
pub use pipeline::{
    Pipeline, PipelineReport, RunRequest, RunRequestBuilder, build_fetcher, build_uploader,
    parse_tags,
};

pub use tagrelay_error::*;
pub use tagrelay_fetch::{
    FetchConfig, FetchReport, HashtagClient, ItemOutcome, MediaFetcher, SearchCredentials,
    SearchItem, SearchPage, SkipReason, TagReport, media_filename,
};
pub use tagrelay_ledger::{LEDGER_HEADER, Ledger, MediaId, MediaKind, MediaRecord};
pub use tagrelay_retry::{RetryPolicy, retry_with_backoff};
pub use tagrelay_upload::{
    NoProgress, ProgressSink, TracingProgress, TransferMode, UploadClient, UploadConfig,
    UploadCredentials, UploadOutcome, UploadPhase, UploadProgress, UploadSession, UploadSummary,
    UploadTicket,
};
