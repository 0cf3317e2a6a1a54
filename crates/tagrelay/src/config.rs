//! Layered configuration for the whole pipeline.
//!
//! Sources, lowest precedence first:
//! - Bundled defaults (include_str! from tagrelay.toml)
//! - `~/.config/tagrelay/tagrelay.toml`
//! - `./tagrelay.toml`
//! - `TAGRELAY__SECTION__KEY` environment variables

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tagrelay_error::{ConfigError, RelayResult};
use tagrelay_fetch::FetchConfig;
use tagrelay_upload::UploadConfig;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../tagrelay.toml");

/// Where the download ledger lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct LedgerConfig {
    /// Path of the CSV log.
    #[serde(default = "default_ledger_path")]
    path: PathBuf,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("download_history.csv")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

/// Complete pipeline configuration.
///
/// Constructed explicitly and passed down; nothing reads configuration from
/// global state.
///
/// # Example
///
/// ```toml
/// [ledger]
/// path = "download_history.csv"
///
/// [fetch]
/// max_pages = 5
///
/// [upload]
/// default_category_id = 25
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct RelayConfig {
    /// Ledger settings.
    #[serde(default)]
    ledger: LedgerConfig,
    /// Search and download settings.
    #[serde(default)]
    fetch: FetchConfig,
    /// Upload settings.
    #[serde(default)]
    upload: UploadConfig,
}

impl RelayConfig {
    /// Load with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or a value has the
    /// wrong type.
    #[instrument]
    pub fn load() -> RelayResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/tagrelay/tagrelay.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("tagrelay").required(false))
            .add_source(
                Environment::with_prefix("TAGRELAY")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Load bundled defaults overlaid with a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or invalid.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> RelayResult<Self> {
        debug!("Loading configuration from file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    /// Parse a TOML document on top of the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid.
    pub fn from_toml_str(toml: &str) -> RelayResult<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> RelayResult<Self> {
        let config = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to load configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;
        Ok(config)
    }

    /// Replace the ledger path.
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger.path = path.into();
        self
    }

    /// Replace the fetch settings.
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Replace the upload settings.
    pub fn with_upload(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_match_code_defaults() {
        let config = RelayConfig::from_toml_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn overrides_apply_per_key() {
        let config = RelayConfig::from_toml_str(
            r#"
            [fetch]
            max_pages = 2

            [upload]
            transfer_mode = "chunked"
            "#,
        )
        .unwrap();
        assert_eq!(*config.fetch().max_pages(), 2);
        assert_eq!(*config.fetch().courtesy_delay_max_ms(), 1_500);
        assert_eq!(
            *config.upload().transfer_mode(),
            tagrelay_upload::TransferMode::Chunked
        );
    }
}
