//! Hashtag search client and deduplicating media fetcher.
//!
//! [`HashtagClient`] talks to the third-party hashtag search endpoint and
//! returns typed pages. [`MediaFetcher`] walks those pages for each tag,
//! keeps only items of the requested [`MediaKind`], consults the
//! [`Ledger`](tagrelay_ledger::Ledger) to skip anything fetched before,
//! downloads the rest, and records every success.
//!
//! Failures are contained: a broken item is skipped, a broken search only
//! ends its own tag.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod fetcher;
mod outcome;
mod schema;

pub use client::HashtagClient;
pub use config::{FetchConfig, SearchCredentials};
pub use fetcher::{MediaFetcher, media_filename};
pub use outcome::{FetchReport, ItemOutcome, SkipReason, TagReport};
pub use schema::{ImageVersion, ImageVersions, SearchItem, SearchPage};
pub use tagrelay_error::{FetchError, FetchErrorKind, FetchResult};
pub use tagrelay_ledger::MediaKind;
