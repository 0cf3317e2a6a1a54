//! Per-item, per-tag and per-run fetch results.

use std::path::PathBuf;
use tagrelay_error::FetchError;
use tagrelay_ledger::MediaId;

/// Why an item was passed over without a download attempt.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SkipReason {
    /// The ledger already holds this id.
    #[display("already downloaded")]
    AlreadyDownloaded,
    /// The item is not of the requested media kind, or its kind is unknown.
    #[display("kind mismatch")]
    KindMismatch,
    /// The item carries no usable URL for the requested kind.
    #[display("missing media url")]
    MissingUrl,
    /// The id contains characters that cannot appear in a filename.
    #[display("unsafe id")]
    UnsafeId,
}

/// Result of processing one search item.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Bytes were written here and the ledger row was appended.
    Downloaded(PathBuf),
    /// Nothing was fetched.
    Skipped(SkipReason),
    /// The download or its bookkeeping failed; the item stays eligible.
    Failed(FetchError),
}

/// Summary of one tag's fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct TagReport {
    /// The hashtag.
    tag: String,
    /// Files written, in download order.
    downloaded: Vec<PathBuf>,
    /// Ids skipped because the ledger already had them.
    already_downloaded: Vec<MediaId>,
    /// Items skipped for any other reason.
    skipped: usize,
    /// Items whose download failed.
    failed: usize,
    /// Search pages requested.
    pages: u32,
}

impl TagReport {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn absorb(&mut self, id: &MediaId, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Downloaded(path) => self.downloaded.push(path),
            ItemOutcome::Skipped(SkipReason::AlreadyDownloaded) => {
                self.already_downloaded.push(id.clone())
            }
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub(crate) fn page_fetched(&mut self) {
        self.pages += 1;
    }

    /// Number of files written for this tag.
    pub fn downloaded_count(&self) -> usize {
        self.downloaded.len()
    }

    /// Consume the report, keeping only the written paths.
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.downloaded
    }
}

/// Summary of a multi-tag fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct FetchReport {
    /// Reports for tags whose search succeeded, in tag order.
    tags: Vec<TagReport>,
    /// Tags whose search failed, with the cause.
    failed_tags: Vec<(String, String)>,
    /// Tags never started because the run was cancelled.
    cancelled_tags: Vec<String>,
}

impl FetchReport {
    pub(crate) fn push_tag(&mut self, report: TagReport) {
        self.tags.push(report);
    }

    pub(crate) fn push_failure(&mut self, tag: &str, error: &FetchError) {
        self.failed_tags.push((tag.to_string(), error.kind.to_string()));
    }

    pub(crate) fn push_cancelled(&mut self, tag: &str) {
        self.cancelled_tags.push(tag.to_string());
    }

    /// Every written path across all tags, in tag order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.tags
            .iter()
            .flat_map(|t| t.downloaded().iter().cloned())
            .collect()
    }

    /// Total files written.
    pub fn downloaded_count(&self) -> usize {
        self.tags.iter().map(TagReport::downloaded_count).sum()
    }

    /// Tags whose search succeeded.
    pub fn succeeded_tag_count(&self) -> usize {
        self.tags.len()
    }
}
