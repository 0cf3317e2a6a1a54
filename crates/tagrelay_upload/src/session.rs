//! Per-attempt upload state.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tagrelay_error::{UploadError, UploadErrorKind, UploadResult};
use tracing::{debug, warn};

/// Where an upload attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum UploadPhase {
    /// Asking for a signed URL.
    #[display("requesting_url")]
    RequestingUrl,
    /// Sending bytes to the signed URL.
    #[display("uploading")]
    Uploading,
    /// Creating the post that references the uploaded bytes.
    #[display("creating_post")]
    CreatingPost,
    /// The post exists.
    #[display("done")]
    Done,
    /// The attempt was abandoned.
    #[display("failed")]
    Failed,
}

impl UploadPhase {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadPhase::Done | UploadPhase::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_advance_to(self, next: UploadPhase) -> bool {
        match (self, next) {
            (from, UploadPhase::Failed) => !from.is_terminal(),
            (UploadPhase::RequestingUrl, UploadPhase::Uploading)
            | (UploadPhase::Uploading, UploadPhase::CreatingPost)
            | (UploadPhase::CreatingPost, UploadPhase::Done) => true,
            _ => false,
        }
    }
}

/// Signed URL and correlation hash handed out by the destination service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    /// Where to PUT the bytes.
    pub url: String,
    /// Opaque token tying the bytes to the post.
    pub hash: String,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    hash: Option<String>,
}

impl UploadTicket {
    /// Decode the issuance response, requiring a `success` status.
    pub(crate) fn from_response(body: &str) -> UploadResult<Self> {
        let response: UploadUrlResponse = serde_json::from_str(body).map_err(|e| {
            UploadError::new(UploadErrorKind::UploadUrl(format!("invalid response: {}", e)))
        })?;

        let status = response.status.unwrap_or_default();
        if !status.eq_ignore_ascii_case("success") {
            return Err(UploadError::new(UploadErrorKind::UploadUrl(format!(
                "service answered with status '{}'",
                status
            ))));
        }

        match (response.url, response.hash) {
            (Some(url), Some(hash)) if !url.is_empty() && !hash.is_empty() => Ok(Self { url, hash }),
            _ => Err(UploadError::new(UploadErrorKind::UploadUrl(
                "response is missing url or hash".to_string(),
            ))),
        }
    }
}

/// State of one upload attempt for one file.
///
/// A session lives for a single attempt. A retry builds a fresh one and asks
/// for a new ticket.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct UploadSession {
    /// File being uploaded.
    file_path: PathBuf,
    /// Size in bytes at the start of the attempt.
    file_size: u64,
    /// Destination category.
    category_id: u32,
    /// 1-based attempt number.
    attempt: u32,
    /// Ticket from the first phase, once obtained.
    ticket: Option<UploadTicket>,
    /// Current phase.
    phase: UploadPhase,
}

impl UploadSession {
    /// Start a session in [`UploadPhase::RequestingUrl`].
    pub fn new(file_path: impl AsRef<Path>, file_size: u64, category_id: u32, attempt: u32) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            file_size,
            category_id,
            attempt,
            ticket: None,
            phase: UploadPhase::RequestingUrl,
        }
    }

    /// Move to `next`, returning whether the transition was allowed.
    pub fn advance(&mut self, next: UploadPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            warn!(
                path = %self.file_path.display(),
                from = %self.phase,
                to = %next,
                "Ignoring invalid upload phase transition"
            );
            return false;
        }
        debug!(
            path = %self.file_path.display(),
            attempt = self.attempt,
            from = %self.phase,
            to = %next,
            "Upload phase changed"
        );
        self.phase = next;
        true
    }

    pub(crate) fn attach_ticket(&mut self, ticket: UploadTicket) {
        self.ticket = Some(ticket);
    }

    /// Signed URL, once the first phase has succeeded.
    pub fn upload_url(&self) -> Option<&str> {
        self.ticket.as_ref().map(|t| t.url.as_str())
    }

    /// Content hash, once the first phase has succeeded.
    pub fn content_hash(&self) -> Option<&str> {
        self.ticket.as_ref().map(|t| t.hash.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut session = UploadSession::new("clip.mp4", 12, 25, 1);
        assert!(session.advance(UploadPhase::Uploading));
        assert!(session.advance(UploadPhase::CreatingPost));
        assert!(session.advance(UploadPhase::Done));
        assert_eq!(*session.phase(), UploadPhase::Done);
    }

    #[test]
    fn failed_is_reachable_until_terminal() {
        let mut session = UploadSession::new("clip.mp4", 12, 25, 1);
        assert!(session.advance(UploadPhase::Uploading));
        assert!(session.advance(UploadPhase::Failed));
        assert!(!session.advance(UploadPhase::CreatingPost));
        assert!(!session.advance(UploadPhase::Failed));
        assert_eq!(*session.phase(), UploadPhase::Failed);
    }

    #[test]
    fn phases_cannot_be_skipped() {
        let mut session = UploadSession::new("clip.mp4", 12, 25, 1);
        assert!(!session.advance(UploadPhase::CreatingPost));
        assert_eq!(*session.phase(), UploadPhase::RequestingUrl);
    }

    #[test]
    fn ticket_requires_success_status() {
        let ticket =
            UploadTicket::from_response(r#"{"status":"success","url":"https://s/u","hash":"h"}"#)
                .unwrap();
        assert_eq!(ticket.hash, "h");

        let err = UploadTicket::from_response(r#"{"status":"error","url":"https://s/u","hash":"h"}"#)
            .unwrap_err();
        assert!(matches!(err.kind, UploadErrorKind::UploadUrl(_)));

        let err = UploadTicket::from_response(r#"{"status":"success","url":""}"#).unwrap_err();
        assert!(matches!(err.kind, UploadErrorKind::UploadUrl(_)));
    }
}
