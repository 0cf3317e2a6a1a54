//! Fetch-then-upload orchestration.

use crate::RelayConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tagrelay_error::{ConfigError, RelayResult};
use tagrelay_fetch::{FetchReport, HashtagClient, MediaFetcher, MediaKind, SearchCredentials};
use tagrelay_ledger::Ledger;
use tagrelay_upload::{UploadClient, UploadCredentials, UploadOutcome, UploadSummary};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Split a comma-separated tag list, dropping blanks, `#` prefixes and repeats.
///
/// # Examples
///
/// ```
/// use tagrelay::parse_tags;
///
/// assert_eq!(parse_tags(" #sunrise, beach,,sunrise "), vec!["sunrise", "beach"]);
/// ```
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in input.split(',') {
        let tag = tag.trim().trim_start_matches('#').trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// What a pipeline run should do.
#[derive(Debug, Clone, PartialEq, Eq, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct RunRequest {
    /// Hashtags, in processing order.
    tags: Vec<String>,
    /// New items wanted per tag.
    #[builder(default = "1")]
    max_items: usize,
    /// Kind of media to fetch.
    #[builder(default = "MediaKind::Video")]
    kind: MediaKind,
    /// Destination category for uploads.
    #[builder(default = "25")]
    category_id: u32,
    /// Upload attempts per file.
    #[builder(default = "3")]
    max_retries: u32,
}

impl RunRequest {
    /// Start building a request.
    pub fn builder() -> RunRequestBuilder {
        RunRequestBuilder::default()
    }
}

impl RunRequestBuilder {
    /// Build and validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error if no tag is given or `max_items` is zero.
    pub fn build(&self) -> Result<RunRequest, ConfigError> {
        let request = self
            .build_internal()
            .map_err(|e| ConfigError::new(e.to_string()))?;
        if request.tags.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::new("at least one hashtag is required"));
        }
        if request.max_items == 0 {
            return Err(ConfigError::new("max items must be at least 1"));
        }
        Ok(request)
    }
}

/// Aggregate result of a pipeline run.
#[derive(Debug, derive_getters::Getters)]
pub struct PipelineReport {
    /// Fetch stage result.
    fetch: FetchReport,
    /// Per-file upload results, in download order.
    uploads: Vec<UploadOutcome>,
    /// Upload counts.
    upload_summary: UploadSummary,
    /// Whether an interrupt stopped the run early.
    cancelled: bool,
}

/// Build a fetcher from configuration, opening the ledger.
///
/// # Errors
///
/// Returns an error if the ledger cannot be opened or the HTTP client fails
/// to build.
pub fn build_fetcher(config: &RelayConfig, credentials: SearchCredentials) -> RelayResult<MediaFetcher> {
    let ledger = Arc::new(Ledger::load(config.ledger().path())?);
    info!(path = %ledger.path().display(), entries = ledger.len(), "Opened download ledger");
    let client = HashtagClient::new(config.fetch(), credentials)?;
    Ok(MediaFetcher::new(client, ledger, config.fetch().clone())?)
}

/// Build an upload client from configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client fails to build.
pub fn build_uploader(config: &RelayConfig, credentials: UploadCredentials) -> RelayResult<UploadClient> {
    Ok(UploadClient::new(config.upload().clone(), credentials)?)
}

/// Runs the fetch stage over all tags, then uploads what was downloaded.
#[derive(Debug, Clone)]
pub struct Pipeline {
    fetcher: MediaFetcher,
    uploader: Option<UploadClient>,
    cancel: Option<watch::Receiver<bool>>,
}

impl Pipeline {
    /// Pipeline that can only fetch until an uploader is attached.
    pub fn new(fetcher: MediaFetcher) -> Self {
        Self {
            fetcher,
            uploader: None,
            cancel: None,
        }
    }

    /// Attach the upload client.
    pub fn with_uploader(mut self, uploader: UploadClient) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Stop between tags, and before uploading, once `cancel` reads `true`.
    pub fn with_cancellation(self, cancel: watch::Receiver<bool>) -> Self {
        let Self {
            fetcher, uploader, ..
        } = self;
        Self {
            fetcher: fetcher.with_cancellation(cancel.clone()),
            uploader,
            cancel: Some(cancel),
        }
    }

    /// The fetcher, with its ledger.
    pub fn fetcher(&self) -> &MediaFetcher {
        &self.fetcher
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run only the fetch stage.
    pub async fn fetch(&self, request: &RunRequest) -> FetchReport {
        self.fetcher
            .fetch_tags(request.tags(), *request.max_items(), *request.kind())
            .await
    }

    /// Run only the upload stage over `files`.
    ///
    /// # Errors
    ///
    /// Returns an error if no upload client is attached.
    pub async fn upload(
        &self,
        files: &[PathBuf],
        category_id: u32,
        max_retries: u32,
    ) -> RelayResult<Vec<UploadOutcome>> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| ConfigError::new("upload client is not configured"))?;
        Ok(uploader.upload_batch(files, category_id, max_retries).await)
    }

    /// Fetch every tag, then upload every downloaded file.
    ///
    /// Per-item, per-tag and per-file failures are reported, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error before any search or download if no upload client is
    /// attached, so nothing is recorded in the ledger without being relayed.
    #[instrument(skip(self, request), fields(tags = request.tags().len(), kind = %request.kind()))]
    pub async fn run(&self, request: &RunRequest) -> RelayResult<PipelineReport> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| ConfigError::new("upload client is not configured"))?;

        let fetch = self.fetch(request).await;
        let files = fetch.paths();
        info!(downloaded = files.len(), "Fetch stage complete");

        if self.is_cancelled() {
            warn!(pending = files.len(), "Cancelled before upload stage");
            return Ok(PipelineReport {
                fetch,
                uploads: Vec::new(),
                upload_summary: UploadSummary::default(),
                cancelled: true,
            });
        }

        let uploads = if files.is_empty() {
            Vec::new()
        } else {
            uploader
                .upload_batch(&files, *request.category_id(), *request.max_retries())
                .await
        };
        let upload_summary = UploadSummary::from(uploads.as_slice());
        info!(%upload_summary, "Upload stage complete");

        Ok(PipelineReport {
            fetch,
            uploads,
            upload_summary,
            cancelled: false,
        })
    }
}
