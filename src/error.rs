//! Error types for report-dl
//!
//! Two layers:
//! - [`Error`] for crate-level operations (configuration, catalog ingestion, I/O)
//! - [`DownloadError`] for failures inside a single item pipeline; these are never
//!   propagated to the batch, they end up inside a [`crate::types::TransferOutcome`]

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for report-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for report-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// A metadata record failed validation at the ingestion boundary
    #[error("invalid record '{filename}': {field} {reason}")]
    InvalidRecord {
        /// Filename of the offending record (may be empty)
        filename: String,
        /// Name of the field that failed validation
        field: &'static str,
        /// Why the field was rejected
        reason: String,
    },

    /// Item pipeline error surfaced outside of a pipeline run
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failures of one item pipeline stage
///
/// String-carrying so an error can be cloned into outcomes and broadcast events.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// The record was rejected before any request or filesystem access
    #[error("invalid record: {field} {reason}")]
    InvalidRecord {
        /// Name of the field that failed validation
        field: String,
        /// Why the field was rejected
        reason: String,
    },

    /// The splash page could not be retrieved
    #[error("failed to fetch splash page {url}: {reason}")]
    SplashFetch {
        /// Preview link that was requested
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// The splash page did not contain the embedded shared-item configuration
    #[error("malformed splash page: {reason}")]
    MalformedPage {
        /// What was missing or unparsable
        reason: String,
    },

    /// Network failure, disk write failure, or truncated stream during a transfer
    #[error("transfer of {url} failed: {reason}")]
    Transfer {
        /// Direct download URL
        url: String,
        /// The underlying failure
        reason: String,
    },

    /// The destination appeared between the presence check and file creation
    #[error("destination {path} already exists")]
    DestinationExists {
        /// The path that was already taken
        path: PathBuf,
    },

    /// Downloaded bytes do not hash to the expected SHA-1
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// File that was verified (already removed when this is reported)
        path: PathBuf,
        /// Checksum from the metadata record
        expected: String,
        /// Digest computed while streaming
        actual: String,
    },

    /// Renaming the file to its canonical extension failed
    #[error("failed to rename {from} to {to}: {reason}")]
    Rename {
        /// Original path
        from: PathBuf,
        /// Intended path
        to: PathBuf,
        /// The I/O error
        reason: String,
    },
}

impl DownloadError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            DownloadError::InvalidRecord { .. } => "invalid_record",
            DownloadError::SplashFetch { .. } => "splash_fetch_failed",
            DownloadError::MalformedPage { .. } => "malformed_page",
            DownloadError::Transfer { .. } => "transfer_error",
            DownloadError::DestinationExists { .. } => "destination_exists",
            DownloadError::ChecksumMismatch { .. } => "checksum_mismatch",
            DownloadError::Rename { .. } => "rename_failed",
        }
    }

    /// Carry a record validation failure into a pipeline outcome
    pub(crate) fn from_validation(err: Error) -> Self {
        match err {
            Error::InvalidRecord { field, reason, .. } => DownloadError::InvalidRecord {
                field: field.to_string(),
                reason,
            },
            other => DownloadError::InvalidRecord {
                field: "record".to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        DownloadError::MalformedPage {
            reason: reason.into(),
        }
    }

    pub(crate) fn transfer(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        DownloadError::Transfer {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
