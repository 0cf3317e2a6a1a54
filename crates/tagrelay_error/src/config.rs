//! Configuration error types.

/// Configuration error with source location.
///
/// Raised for unreadable configuration files and for credentials missing from
/// the process environment.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagrelay_error::ConfigError;
    ///
    /// let err = ConfigError::new("FLIC_TOKEN is not set");
    /// assert!(err.message.contains("FLIC_TOKEN"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Error for a required environment variable that is absent or empty.
    #[track_caller]
    pub fn missing_env(name: &str) -> Self {
        Self::new(format!("{} environment variable not set", name))
    }
}

/// Read a required, non-empty environment variable.
///
/// # Errors
///
/// Returns [`ConfigError::missing_env`] when the variable is unset or blank.
#[track_caller]
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::missing_env(name)),
    }
}
