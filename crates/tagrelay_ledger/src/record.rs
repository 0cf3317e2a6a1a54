//! Ledger rows.

use crate::MediaId;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successful download, as remembered by the ledger.
///
/// Created once, at the moment the media bytes are durably written, and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct MediaRecord {
    /// Hashtag that produced this media.
    tag: String,
    /// Canonical media identifier.
    id: MediaId,
    /// Time of the successful download.
    downloaded_at: DateTime<Utc>,
    /// Origin URL of the media bytes.
    source_url: String,
    /// Where the bytes were persisted.
    local_path: PathBuf,
}

impl MediaRecord {
    /// Create a record stamped with the given time.
    pub fn new(
        tag: impl Into<String>,
        id: impl Into<MediaId>,
        downloaded_at: DateTime<Utc>,
        source_url: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tag: tag.into(),
            id: id.into(),
            downloaded_at,
            source_url: source_url.into(),
            local_path: local_path.into(),
        }
    }

    pub(crate) fn to_row(&self) -> LedgerRow {
        LedgerRow {
            tag: self.tag.clone(),
            id: self.id.to_string(),
            timestamp: self.downloaded_at.to_rfc3339(),
            source_url: self.source_url.clone(),
            filename: self.local_path.to_string_lossy().into_owned(),
        }
    }

    /// Rebuild a record from a stored row, or `None` if the row is malformed.
    pub(crate) fn from_row(row: LedgerRow) -> Option<Self> {
        let id = MediaId::from(row.id);
        if id.is_empty() {
            return None;
        }
        let downloaded_at = parse_timestamp(&row.timestamp)?;
        Some(Self {
            tag: row.tag,
            id,
            downloaded_at,
            source_url: row.source_url,
            local_path: PathBuf::from(row.filename),
        })
    }
}

/// On-disk column layout: `tag,id,timestamp,source_url,filename`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LedgerRow {
    pub(crate) tag: String,
    pub(crate) id: String,
    pub(crate) timestamp: String,
    pub(crate) source_url: String,
    pub(crate) filename: String,
}

/// Accepts RFC 3339 as well as the fractional Unix epoch seconds older
/// ledgers were written with.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let secs: f64 = raw.parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
    Utc.timestamp_opt(whole, nanos).single()
}
