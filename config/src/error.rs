//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

/// Configuration and profile storage errors
#[derive(Error, Debug)]
pub enum ConfigError {
  /// Reading or writing a file failed
  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Profile document could not be parsed or written
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  /// Settings file could not be parsed
  #[error("TOML error in {path}: {message}")]
  Toml { path: PathBuf, message: String },

  /// A `key=value` override was rejected
  #[error("Invalid override {key}: {message}")]
  InvalidOverride { key: String, message: String },

  /// No profile with the given id
  #[error("Provider configuration not found: {0}")]
  NotFound(String),

  /// No home directory to place the default files in
  #[error("No home directory found")]
  NoHomeDir,
}

/// Alias for Result<T, ConfigError>
pub type Result<T> = std::result::Result<T, ConfigError>;
