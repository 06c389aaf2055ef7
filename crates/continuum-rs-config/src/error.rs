//! Error types for config loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading or validating config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a config file failed.
    #[error("failed to read config {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Resolving the working directory failed.
    #[error("failed to resolve {}: {source}", path.display())]
    ResolveFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A layer is not valid JSON5.
    #[error("failed to parse config {label}: {source}")]
    ParseFailed { label: String, source: json5::Error },
    /// Converting the merged JSON into the typed model failed.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A specific field failed schema validation.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// A decoded value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
