//! Deduplicating media fetcher.

use crate::{
    FetchConfig, FetchReport, HashtagClient, ItemOutcome, SearchItem, SkipReason, TagReport,
};
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tagrelay_error::{FetchError, FetchErrorKind, FetchResult};
use tagrelay_ledger::{Ledger, MediaId, MediaKind};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Derive the on-disk name for a media item: `{tag}_{id}_{kind}.{ext}`.
///
/// Characters outside `[A-Za-z0-9_-]` are replaced so upstream values can
/// never escape the media directory.
///
/// # Examples
///
/// ```
/// use tagrelay_fetch::{MediaKind, media_filename};
/// use tagrelay_ledger::MediaId;
///
/// let name = media_filename("sunrise", &MediaId::from(42_u64), MediaKind::Image);
/// assert_eq!(name, "sunrise_42_image.jpg");
/// ```
pub fn media_filename(tag: &str, id: &MediaId, kind: MediaKind) -> String {
    format!(
        "{}_{}_{}.{}",
        sanitize(tag),
        sanitize(id.as_str()),
        kind.as_str(),
        kind.extension()
    )
}

fn sanitize(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('#')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Whether `id` can be used in a filename as-is.
///
/// Ids that would need rewriting are refused instead, since two rewritten
/// ids could land on the same file.
fn is_safe_id(id: &MediaId) -> bool {
    id.as_str()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Randomized pause inserted between consecutive downloads.
struct Pacer {
    min_ms: u64,
    max_ms: u64,
    started: bool,
}

impl Pacer {
    fn new(config: &FetchConfig) -> Self {
        Self {
            min_ms: *config.courtesy_delay_min_ms(),
            max_ms: (*config.courtesy_delay_max_ms()).max(*config.courtesy_delay_min_ms()),
            started: false,
        }
    }

    async fn wait(&mut self) {
        if !self.started {
            self.started = true;
            return;
        }
        if self.max_ms == 0 {
            return;
        }
        let millis = rand::rng().random_range(self.min_ms..=self.max_ms);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

/// Walks hashtag search results, downloads new media and records it.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    client: HashtagClient,
    http: Client,
    ledger: Arc<Ledger>,
    config: FetchConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl MediaFetcher {
    /// Create a fetcher that downloads with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the download HTTP client cannot be built.
    pub fn new(client: HashtagClient, ledger: Arc<Ledger>, config: FetchConfig) -> FetchResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                FetchError::new(FetchErrorKind::Network(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;
        Ok(Self {
            client,
            http,
            ledger,
            config,
            cancel: None,
        })
    }

    /// Stop starting new tags once the receiver observes `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The ledger this fetcher consults and appends to.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fetch up to `max_items` new items of `kind` for every tag in order.
    ///
    /// A tag whose search fails is logged and recorded in the report; the
    /// remaining tags still run.
    #[instrument(skip(self, tags), fields(tags = tags.len()))]
    pub async fn fetch_tags(&self, tags: &[String], max_items: usize, kind: MediaKind) -> FetchReport {
        let mut report = FetchReport::default();

        for tag in tags {
            if self.is_cancelled() {
                warn!(tag = %tag, "Cancelled before tag started");
                report.push_cancelled(tag);
                continue;
            }
            match self.fetch_for_tag(tag, max_items, kind).await {
                Ok(tag_report) => report.push_tag(tag_report),
                Err(e) => {
                    error!(tag = %tag, error = %e, "Failed to process tag");
                    report.push_failure(tag, &e);
                }
            }
        }

        info!(
            downloaded = report.downloaded_count(),
            succeeded_tags = report.succeeded_tag_count(),
            failed_tags = report.failed_tags().len(),
            "Finished fetching media"
        );
        report
    }

    /// Fetch up to `max_items` new items of `kind` for a single tag.
    ///
    /// Pages are followed through their continuation tokens until the cap is
    /// met, the upstream runs dry, or `max_pages` is reached.
    ///
    /// # Errors
    ///
    /// Returns an error when the media directory cannot be created or the
    /// first search page cannot be retrieved. A failure on a later page ends
    /// pagination but keeps what was already downloaded.
    #[instrument(skip(self))]
    pub async fn fetch_for_tag(
        &self,
        tag: &str,
        max_items: usize,
        kind: MediaKind,
    ) -> FetchResult<TagReport> {
        let dir = self.config.dir_for(kind);
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            FetchError::new(FetchErrorKind::Storage(format!("{}: {}", dir.display(), e)))
        })?;

        info!(tag, max_items, %kind, "Processing hashtag");

        let mut report = TagReport::new(tag);
        let mut pacer = Pacer::new(&self.config);
        let mut token: Option<String> = None;

        while report.downloaded_count() < max_items && *report.pages() < *self.config.max_pages() {
            let page = match self.client.search(tag, token.as_deref()).await {
                Ok(page) => page,
                Err(e) if *report.pages() == 0 => return Err(e),
                Err(e) => {
                    warn!(tag, pages = *report.pages(), error = %e, "Stopping pagination after failed page");
                    break;
                }
            };
            report.page_fetched();

            let (mut candidates, others): (Vec<SearchItem>, Vec<SearchItem>) = page
                .items
                .into_iter()
                .partition(|item| item.kind() == Some(kind));
            for item in &others {
                if let Some(id) = item.media_id() {
                    report.absorb(id, ItemOutcome::Skipped(SkipReason::KindMismatch));
                }
            }
            candidates.shuffle(&mut rand::rng());
            debug!(tag, candidates = candidates.len(), filtered = others.len(), "Selected candidates");

            for item in &candidates {
                if report.downloaded_count() >= max_items {
                    break;
                }
                let Some(id) = item.media_id() else {
                    continue;
                };
                let outcome = self.fetch_item(tag, id, item, kind, &mut pacer).await;
                report.absorb(id, outcome);
            }

            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!(
            tag,
            downloaded = report.downloaded_count(),
            already_downloaded = report.already_downloaded().len(),
            failed = *report.failed(),
            pages = *report.pages(),
            "Finished hashtag"
        );
        Ok(report)
    }

    async fn fetch_item(
        &self,
        tag: &str,
        id: &MediaId,
        item: &SearchItem,
        kind: MediaKind,
        pacer: &mut Pacer,
    ) -> ItemOutcome {
        if self.ledger.contains(id) {
            info!(tag, id = %id, "Skipping already downloaded media");
            return ItemOutcome::Skipped(SkipReason::AlreadyDownloaded);
        }
        if !is_safe_id(id) {
            warn!(tag, id = %id, "Skipping item whose id is not filename-safe");
            return ItemOutcome::Skipped(SkipReason::UnsafeId);
        }
        let Some(url) = item.media_url(kind) else {
            debug!(tag, id = %id, "Skipping item without media url");
            return ItemOutcome::Skipped(SkipReason::MissingUrl);
        };

        pacer.wait().await;

        let path = self.config.dir_for(kind).join(media_filename(tag, id, kind));
        if let Err(e) = self.download_to(url, &path).await {
            warn!(tag, id = %id, url, error = %e, "Failed to download media");
            return ItemOutcome::Failed(e);
        }

        match self.ledger.record(tag, id, url, &path) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(tag, id = %id, path = %path.display(), "Media was recorded by another fetch meanwhile");
                return ItemOutcome::Skipped(SkipReason::AlreadyDownloaded);
            }
            Err(e) => {
                error!(tag, id = %id, error = %e, "Downloaded media but failed to record it");
                return ItemOutcome::Failed(FetchError::new(FetchErrorKind::Storage(
                    e.kind.to_string(),
                )));
            }
        }

        info!(tag, id = %id, path = %path.display(), "Downloaded media");
        ItemOutcome::Downloaded(path)
    }

    /// Stream `url` into `path` through a temporary sibling file.
    async fn download_to(&self, url: &str, path: &Path) -> FetchResult<()> {
        let mut response = self
            .http
            .get(url)
            .timeout(self.config.download_timeout())
            .send()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(FetchErrorKind::Upstream {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            }));
        }

        let temp_path = temp_path_for(path);
        let result = async {
            let mut file = tokio::fs::File::create(&temp_path).await.map_err(|e| {
                FetchError::new(FetchErrorKind::Storage(format!("{}: {}", temp_path.display(), e)))
            })?;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| FetchError::new(FetchErrorKind::Network(e.to_string())))?
            {
                file.write_all(&chunk).await.map_err(|e| {
                    FetchError::new(FetchErrorKind::Storage(format!("{}: {}", temp_path.display(), e)))
                })?;
            }
            file.flush().await.map_err(|e| {
                FetchError::new(FetchErrorKind::Storage(format!("{}: {}", temp_path.display(), e)))
            })?;
            tokio::fs::rename(&temp_path, path).await.map_err(|e| {
                FetchError::new(FetchErrorKind::Storage(format!(
                    "rename {} to {}: {}",
                    temp_path.display(),
                    path.display(),
                    e
                )))
            })
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
        result
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized() {
        let id = MediaId::from("12/../34");
        assert_eq!(
            media_filename("#golden hour", &id, MediaKind::Video),
            "golden_hour_12____34_video.mp4"
        );
    }

    #[test]
    fn only_plain_ids_are_safe() {
        assert!(is_safe_id(&MediaId::from("3141_59-26")));
        assert!(!is_safe_id(&MediaId::from("12/34")));
        assert!(!is_safe_id(&MediaId::from("12.34")));
    }

    #[test]
    fn temp_path_is_sibling() {
        let temp = temp_path_for(Path::new("videos/a_1_video.mp4"));
        assert_eq!(temp, PathBuf::from("videos/a_1_video.mp4.tmp"));
    }
}
