//! Append-only download ledger for tagrelay.
//!
//! The ledger remembers every media item that has been fetched so repeated
//! runs against the same hashtags never download an item twice. It is a flat
//! CSV log replayed into an in-memory index when opened.
//!
//! # Features
//!
//! - **O(1) membership**: ids are held in a `HashSet` rebuilt from the log
//! - **Write-through**: an id enters the index only after its row is durable
//! - **Lenient replay**: malformed rows are skipped, never fatal
//!
//! # Example
//!
//! ```rust
//! use tagrelay_ledger::Ledger;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = std::env::temp_dir().join("tagrelay-doc-ledger");
//! let ledger = Ledger::load(dir.join("download_history.csv"))?;
//!
//! if !ledger.contains(42_u64) {
//!     ledger.record("sunrise", 42_u64, "https://cdn.example/42.jpg", "images/sunrise_42_image.jpg")?;
//! }
//! assert!(ledger.contains("42"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ledger;
mod media_id;
mod media_kind;
mod record;

pub use ledger::{LEDGER_HEADER, Ledger};
pub use media_id::MediaId;
pub use media_kind::MediaKind;
pub use record::MediaRecord;
pub use tagrelay_error::{StorageError, StorageErrorKind};
