//! Upload configuration and credentials.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tagrelay_error::{ConfigError, require_env};
use tagrelay_retry::RetryPolicy;

/// How file bytes are sent to the signed URL.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// One PUT whose body is read from disk chunk by chunk.
    #[default]
    #[display("streamed")]
    Streamed,
    /// One PUT per chunk, each carrying a `Content-Range` header.
    #[display("chunked")]
    Chunked,
}

/// Settings for the destination upload service.
///
/// # Example
///
/// ```toml
/// [upload]
/// base_url = "https://api.socialverseapp.com"
/// chunk_size = 5242880
/// transfer_mode = "streamed"
/// default_category_id = 25
/// max_retries = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct UploadConfig {
    /// Base URL of the destination API.
    #[serde(default = "default_base_url")]
    base_url: String,

    /// Path of the signed-URL issuance endpoint.
    #[serde(default = "default_upload_url_path")]
    upload_url_path: String,

    /// Path of the post-creation endpoint.
    #[serde(default = "default_posts_path")]
    posts_path: String,

    /// Bytes read from disk and sent per unit.
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,

    /// Streamed single PUT or one PUT per chunk.
    #[serde(default)]
    transfer_mode: TransferMode,

    /// Appended to the file stem to form the post title.
    #[serde(default = "default_title_suffix")]
    title_suffix: String,

    /// Whether created posts appear in the public feed.
    #[serde(default)]
    public_feed: bool,

    /// Category used when the caller does not choose one.
    #[serde(default = "default_category_id")]
    default_category_id: u32,

    /// Whole-attempt retries per file.
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    /// First delay between attempts.
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,

    /// Delay ceiling between attempts.
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,

    /// TCP connect timeout for every request.
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,

    /// Timeout for the URL-issuance and post-creation calls.
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    /// Timeout for each PUT to the signed URL.
    #[serde(default = "default_transfer_timeout_secs")]
    transfer_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.socialverseapp.com".to_string()
}

fn default_upload_url_path() -> String {
    "/posts/generate-upload-url".to_string()
}

fn default_posts_path() -> String {
    "/posts".to_string()
}

fn default_chunk_size() -> usize {
    5 * 1024 * 1024
}

fn default_title_suffix() -> String {
    "_upload".to_string()
}

fn default_category_id() -> u32 {
    25
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_transfer_timeout_secs() -> u64 {
    300
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_url_path: default_upload_url_path(),
            posts_path: default_posts_path(),
            chunk_size: default_chunk_size(),
            transfer_mode: TransferMode::default(),
            title_suffix: default_title_suffix(),
            public_feed: false,
            default_category_id: default_category_id(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

impl UploadConfig {
    /// Point the client at another destination.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the chunk size in bytes.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Choose how bytes are sent.
    pub fn with_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.transfer_mode = mode;
        self
    }

    /// Set the delay window between attempts.
    pub fn with_backoff(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.initial_backoff_ms = initial_ms;
        self.max_backoff_ms = max_ms;
        self
    }

    /// Set the default attempt count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Chunk size, never zero.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Retry policy for `max_retries` attempts with the configured backoff.
    pub fn retry_policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_backoff(self.initial_backoff_ms, self.max_backoff_ms)
    }

    /// Full URL of the signed-URL issuance endpoint.
    pub fn upload_url_endpoint(&self) -> String {
        join_url(&self.base_url, &self.upload_url_path)
    }

    /// Full URL of the post-creation endpoint.
    pub fn posts_endpoint(&self) -> String {
        join_url(&self.base_url, &self.posts_path)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Transfer timeout as a [`Duration`].
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Token for the destination service.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    token: String,
}

impl std::fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl UploadCredentials {
    /// Environment variable holding the token.
    pub const TOKEN_VAR: &'static str = "FLIC_TOKEN";

    /// Wrap an explicit token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read `FLIC_TOKEN` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        require_env(Self::TOKEN_VAR).map(Self::new)
    }

    /// Value sent in the `Flic-Token` header.
    pub fn token(&self) -> &str {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_cleanly() {
        let config = UploadConfig::default().with_base_url("http://localhost:8080/");
        assert_eq!(
            config.upload_url_endpoint(),
            "http://localhost:8080/posts/generate-upload-url"
        );
        assert_eq!(config.posts_endpoint(), "http://localhost:8080/posts");
    }

    #[test]
    fn transfer_mode_parses_lowercase() {
        let config: UploadConfig = serde_json::from_str(r#"{"transfer_mode": "chunked"}"#).unwrap();
        assert_eq!(*config.transfer_mode(), TransferMode::Chunked);
        assert_eq!(*config.chunk_size(), 5 * 1024 * 1024);
        assert_eq!(*config.default_category_id(), 25);
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        assert_eq!(UploadConfig::default().with_chunk_size(0).effective_chunk_size(), 1);
    }

    #[test]
    fn credentials_debug_hides_token() {
        let creds = UploadCredentials::new("super-secret");
        assert!(!format!("{:?}", creds).contains("super-secret"));
    }
}
