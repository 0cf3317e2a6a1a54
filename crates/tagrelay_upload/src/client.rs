//! Destination service client.

use crate::transfer::Transfer;
use crate::{
    ProgressSink, TracingProgress, TransferMode, UploadConfig, UploadCredentials, UploadOutcome,
    UploadPhase, UploadSession, UploadTicket,
};
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagrelay_error::{UploadError, UploadErrorKind, UploadResult};
use tagrelay_retry::retry_with_backoff;
use tracing::{debug, error, info, instrument};

const TOKEN_HEADER: &str = "Flic-Token";

#[derive(Debug, Serialize)]
struct UploadUrlRequest {
    file_size: u64,
}

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    title: String,
    hash: &'a str,
    is_available_in_public_feed: bool,
    category_id: u32,
}

/// Client for the three-phase upload protocol.
#[derive(Clone)]
pub struct UploadClient {
    http: Client,
    config: UploadConfig,
    credentials: UploadCredentials,
    progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for UploadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadClient")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl UploadClient {
    /// Create a client that logs progress through `tracing`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: UploadConfig, credentials: UploadCredentials) -> UploadResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                UploadError::new(UploadErrorKind::Network(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;
        debug!(base_url = %config.base_url(), mode = %config.transfer_mode(), "Creating upload client");
        Ok(Self {
            http,
            config,
            credentials,
            progress: Arc::new(TracingProgress),
        })
    }

    /// Replace the progress sink.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Phase 1: obtain a signed URL and content hash for `file_size` bytes.
    ///
    /// Not retried here; [`upload_single`](Self::upload_single) retries whole
    /// attempts.
    ///
    /// # Errors
    ///
    /// `UploadUrl` when the service does not answer with a `success` status,
    /// `Network` when the request cannot be completed.
    #[instrument(skip(self))]
    pub async fn request_upload_url(&self, file_size: u64) -> UploadResult<UploadTicket> {
        let response = self
            .http
            .post(self.config.upload_url_endpoint())
            .header(TOKEN_HEADER, self.credentials.token())
            .json(&UploadUrlRequest { file_size })
            .timeout(self.config.request_timeout())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Upload URL request failed");
                UploadError::new(UploadErrorKind::Network(e.to_string()))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::new(UploadErrorKind::Network(e.to_string())))?;
        if !status.is_success() {
            return Err(UploadError::new(UploadErrorKind::UploadUrl(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            ))));
        }

        let ticket = UploadTicket::from_response(&body)?;
        debug!(hash = %ticket.hash, "Obtained upload URL");
        Ok(ticket)
    }

    /// Phase 2: send the file's bytes to `upload_url`, starting at byte zero.
    ///
    /// Returns the number of bytes sent.
    ///
    /// # Errors
    ///
    /// `Transfer` on any non-200/204 status or transport failure, `FileRead`
    /// when the file cannot be read.
    #[instrument(skip(self, path, upload_url), fields(path = %path.display()))]
    pub async fn upload_bytes(&self, path: &Path, upload_url: &str) -> UploadResult<u64> {
        let total = file_size(path).await?;
        let transfer = Transfer {
            http: &self.http,
            chunk_size: self.config.effective_chunk_size(),
            timeout: self.config.transfer_timeout(),
            progress: &self.progress,
        };

        match self.config.transfer_mode() {
            TransferMode::Streamed => transfer.streamed(path, upload_url, total).await?,
            TransferMode::Chunked => transfer.chunked(path, upload_url, total).await?,
        }

        debug!(bytes = total, "Transferred file");
        Ok(total)
    }

    /// Phase 3: create the post referencing `content_hash`.
    ///
    /// The title is the file stem plus the configured suffix.
    ///
    /// # Errors
    ///
    /// `PostCreation` unless the service answers 200 or 201.
    #[instrument(skip(self, path, content_hash), fields(path = %path.display()))]
    pub async fn finalize_post(
        &self,
        path: &Path,
        content_hash: &str,
        category_id: u32,
    ) -> UploadResult<()> {
        let request = CreatePostRequest {
            title: self.title_for(path),
            hash: content_hash,
            is_available_in_public_feed: *self.config.public_feed(),
            category_id,
        };

        let response = self
            .http
            .post(self.config.posts_endpoint())
            .header(TOKEN_HEADER, self.credentials.token())
            .json(&request)
            .timeout(self.config.request_timeout())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Post creation request failed");
                UploadError::new(UploadErrorKind::Network(e.to_string()))
            })?;

        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::new(UploadErrorKind::PostCreation { status, message }));
        }

        info!(title = %request.title, category_id, "Created post");
        Ok(())
    }

    /// Upload one file with up to `max_retries` independent attempts.
    ///
    /// A missing file fails immediately. Otherwise every attempt runs all
    /// three phases from scratch with a fresh [`UploadSession`].
    ///
    /// # Errors
    ///
    /// `FileNotFound` without any request, or the last attempt's error once
    /// attempts are exhausted.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn upload_single(
        &self,
        path: &Path,
        category_id: u32,
        max_retries: u32,
    ) -> UploadResult<UploadSession> {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                error!("File not found");
                return Err(UploadError::new(UploadErrorKind::FileNotFound(
                    path.display().to_string(),
                )));
            }
        };

        let policy = self.config.retry_policy(max_retries);
        let session = retry_with_backoff(&policy, "upload", |attempt| {
            self.attempt(path, size, category_id, attempt)
        })
        .await?;

        info!(attempt = *session.attempt(), bytes = size, "Upload complete");
        Ok(session)
    }

    /// Upload every file concurrently, returning outcomes in input order.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn upload_batch(
        &self,
        files: &[PathBuf],
        category_id: u32,
        max_retries: u32,
    ) -> Vec<UploadOutcome> {
        let uploads = files.iter().map(|path| async move {
            let result = self.upload_single(path, category_id, max_retries).await;
            UploadOutcome::new(path.clone(), result)
        });
        join_all(uploads).await
    }

    async fn attempt(
        &self,
        path: &Path,
        file_size: u64,
        category_id: u32,
        attempt: u32,
    ) -> UploadResult<UploadSession> {
        let mut session = UploadSession::new(path, file_size, category_id, attempt);
        self.progress.on_phase(path, *session.phase());

        match self.run_phases(&mut session).await {
            Ok(()) => {
                self.enter(&mut session, UploadPhase::Done);
                Ok(session)
            }
            Err(e) => {
                debug!(phase = %session.phase(), error = %e, "Upload attempt abandoned");
                self.enter(&mut session, UploadPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run_phases(&self, session: &mut UploadSession) -> UploadResult<()> {
        let path = session.file_path().clone();

        let ticket = self.request_upload_url(*session.file_size()).await?;
        let (url, hash) = (ticket.url.clone(), ticket.hash.clone());
        session.attach_ticket(ticket);

        self.enter(session, UploadPhase::Uploading);
        self.upload_bytes(&path, &url).await?;

        self.enter(session, UploadPhase::CreatingPost);
        self.finalize_post(&path, &hash, *session.category_id()).await
    }

    fn enter(&self, session: &mut UploadSession, phase: UploadPhase) {
        if session.advance(phase) {
            self.progress.on_phase(session.file_path(), phase);
        }
    }

    fn title_for(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}{}", stem, self.config.title_suffix())
    }
}

async fn file_size(path: &Path) -> UploadResult<u64> {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .map_err(|e| {
            UploadError::new(UploadErrorKind::FileRead(format!("{}: {}", path.display(), e)))
        })
}
