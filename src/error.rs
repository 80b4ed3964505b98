// src/error.rs

//! Unified error handling for the archiver.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for archiver operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal failed
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The remote API returned something unusable
    #[error("API error at {url}: {message}")]
    Api { url: String, message: String },

    /// A snapshot required by a later stage is not on disk
    #[error("Snapshot not found: {}", path.display())]
    SnapshotMissing { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an API error for the given request URL.
    pub fn api(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Api {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a missing-snapshot error.
    pub fn snapshot_missing(path: impl AsRef<Path>) -> Self {
        Self::SnapshotMissing {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
