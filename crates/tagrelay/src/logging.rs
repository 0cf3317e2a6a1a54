//! Tracing subscriber setup.

use std::env;
use std::path::{Path, PathBuf};
use tagrelay_error::{ConfigError, RelayResult, StorageError, StorageErrorKind};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How log output is filtered and formatted.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info").
    log_level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    json_logs: bool,
    /// Force `debug`, ignoring `RUST_LOG`.
    verbose: bool,
    /// Also append plain-text logs to this file.
    log_file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Defaults: `RUST_LOG` or `info`, human-readable.
    pub fn new() -> Self {
        Self {
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: false,
            verbose: false,
            log_file: None,
        }
    }

    /// Force the `debug` level.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the filter directive.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Mirror log output into `path`.
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    fn filter(&self) -> RelayResult<EnvFilter> {
        let filter = if self.verbose {
            EnvFilter::try_new("debug")
        } else {
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.log_level))
        };
        Ok(filter.map_err(|e| ConfigError::new(format!("Invalid log filter: {}", e)))?)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level unless
/// [`LoggingConfig::with_verbose`] was set. When a log file is configured the
/// returned guard must be held until exit so buffered lines are flushed.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be
/// created, or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> RelayResult<Option<WorkerGuard>> {
    let env_filter = config.filter()?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

/// Non-blocking appender for `path`, creating its directory first.
fn file_writer(path: &Path) -> RelayResult<(NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| {
        StorageError::new(StorageErrorKind::DirectoryCreation(format!(
            "{}: {}",
            dir.display(),
            e
        )))
    })?;
    let name = path
        .file_name()
        .ok_or_else(|| ConfigError::new(format!("Log file has no name: {}", path.display())))?;

    let appender = tracing_appender::rolling::never(dir, name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_ignores_configured_level() {
        let config = LoggingConfig::new()
            .with_log_level("tagrelay=loud")
            .with_verbose(true);
        assert!(config.filter().is_ok());
    }

    #[test]
    fn file_writer_appends_events() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("tagrelay.log");

        let (writer, guard) = file_writer(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(tag = "sunrise", "Processing hashtag");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Processing hashtag"));
        assert!(contents.contains("tag=\"sunrise\""));
    }

    #[test]
    fn log_file_defaults_to_none() {
        assert!(LoggingConfig::new().log_file().is_none());
        let config = LoggingConfig::new().with_log_file(Some(PathBuf::from("tagrelay.log")));
        assert_eq!(config.log_file().as_deref(), Some(Path::new("tagrelay.log")));
    }

    #[test]
    fn invalid_level_is_a_config_error() {
        let config = LoggingConfig::new().with_log_level("tagrelay=loud");
        // RUST_LOG may be set in the test environment; only check when it is not.
        if std::env::var("RUST_LOG").is_err() {
            assert!(config.filter().is_err());
        }
    }
}
