//! Fetch configuration and search credentials.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tagrelay_error::{ConfigError, require_env};
use tagrelay_ledger::MediaKind;
use tagrelay_retry::RetryPolicy;

/// Settings for the hashtag search and media download stage.
///
/// # Example
///
/// ```toml
/// [fetch]
/// search_path = "/v1/hashtag"
/// images_dir = "images"
/// videos_dir = "videos"
/// max_pages = 5
/// courtesy_delay_min_ms = 500
/// courtesy_delay_max_ms = 1500
///
/// [fetch.search_retry]
/// max_attempts = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct FetchConfig {
    /// Base URL of the search API. Defaults to `https://{RAPID_API_HOST}`.
    #[serde(default)]
    search_base_url: Option<String>,

    /// Path of the hashtag search endpoint.
    #[serde(default = "default_search_path")]
    search_path: String,

    /// Directory receiving downloaded images.
    #[serde(default = "default_images_dir")]
    images_dir: PathBuf,

    /// Directory receiving downloaded videos.
    #[serde(default = "default_videos_dir")]
    videos_dir: PathBuf,

    /// Upper bound on result pages requested per tag.
    #[serde(default = "default_max_pages")]
    max_pages: u32,

    /// Lower bound of the randomized pause between downloads.
    #[serde(default = "default_delay_min_ms")]
    courtesy_delay_min_ms: u64,

    /// Upper bound of the randomized pause between downloads.
    #[serde(default = "default_delay_max_ms")]
    courtesy_delay_max_ms: u64,

    /// TCP connect timeout for every request.
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,

    /// Whole-request timeout for a search call.
    #[serde(default = "default_search_timeout_secs")]
    search_timeout_secs: u64,

    /// Whole-request timeout for a media download.
    #[serde(default = "default_download_timeout_secs")]
    download_timeout_secs: u64,

    /// Retry policy for search calls.
    #[serde(default = "default_search_retry")]
    search_retry: RetryPolicy,
}

fn default_search_path() -> String {
    "/v1/hashtag".to_string()
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("videos")
}

fn default_max_pages() -> u32 {
    5
}

fn default_delay_min_ms() -> u64 {
    500
}

fn default_delay_max_ms() -> u64 {
    1_500
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_search_timeout_secs() -> u64 {
    10
}

fn default_download_timeout_secs() -> u64 {
    15
}

fn default_search_retry() -> RetryPolicy {
    RetryPolicy::new(2).with_backoff(1_000, 5_000)
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            search_base_url: None,
            search_path: default_search_path(),
            images_dir: default_images_dir(),
            videos_dir: default_videos_dir(),
            max_pages: default_max_pages(),
            courtesy_delay_min_ms: default_delay_min_ms(),
            courtesy_delay_max_ms: default_delay_max_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            search_retry: default_search_retry(),
        }
    }
}

impl FetchConfig {
    /// Point searches at an explicit base URL.
    pub fn with_search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = Some(url.into());
        self
    }

    /// Set both media directories.
    pub fn with_media_dirs(mut self, images: impl Into<PathBuf>, videos: impl Into<PathBuf>) -> Self {
        self.images_dir = images.into();
        self.videos_dir = videos.into();
        self
    }

    /// Set the courtesy delay window in milliseconds.
    pub fn with_courtesy_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.courtesy_delay_min_ms = min_ms;
        self.courtesy_delay_max_ms = max_ms.max(min_ms);
        self
    }

    /// Set the per-tag page cap.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the search retry policy.
    pub fn with_search_retry(mut self, policy: RetryPolicy) -> Self {
        self.search_retry = policy;
        self
    }

    /// Directory that receives media of `kind`.
    pub fn dir_for(&self, kind: MediaKind) -> &PathBuf {
        match kind {
            MediaKind::Image => &self.images_dir,
            MediaKind::Video => &self.videos_dir,
        }
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Search timeout as a [`Duration`].
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Download timeout as a [`Duration`].
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// API credentials for the hashtag search endpoint.
#[derive(Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct SearchCredentials {
    /// Value of the `x-rapidapi-key` header.
    api_key: String,
    /// Value of the `x-rapidapi-host` header.
    api_host: String,
}

impl std::fmt::Debug for SearchCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCredentials")
            .field("api_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .finish()
    }
}

impl SearchCredentials {
    /// Environment variable holding the API key.
    pub const KEY_VAR: &'static str = "RAPID_API_KEY";
    /// Environment variable holding the API host.
    pub const HOST_VAR: &'static str = "RAPID_API_HOST";

    /// Build credentials from explicit values.
    pub fn new(api_key: impl Into<String>, api_host: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_host: api_host.into(),
        }
    }

    /// Read `RAPID_API_KEY` and `RAPID_API_HOST` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first variable that is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(require_env(Self::KEY_VAR)?, require_env(Self::HOST_VAR)?))
    }
}
