//! # report-dl
//!
//! Bulk downloader for a catalog of published threat-intelligence reports.
//!
//! Each catalog record names a report, the year it belongs to, a link to the
//! hosting service's share page, and the SHA-1 of the file. For every record
//! the downloader:
//!
//! 1. Skips it when a file for it already exists on disk
//! 2. Fetches the share page and extracts the direct download URL
//! 3. Streams the file to `<download_dir>/<year>/<filename>`, hashing as it goes
//! 4. Verifies the SHA-1 and removes the file on mismatch
//! 5. Sniffs the content and appends `.pdf`, `.xlsx` or `.docx` when recognized
//!
//! Failures are confined to the record they belong to. A batch always runs to
//! completion and reports an outcome per record.
//!
//! ## Quick Start
//!
//! ```no_run
//! use report_dl::{Config, ReportDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.download_dir = "reports".into();
//!     config.download.max_concurrent_downloads = 4;
//!
//!     let downloader = ReportDownloader::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader.run_catalog().await;
//!     println!("{} downloaded, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Catalog fetching and record validation
pub mod catalog;
/// Incremental SHA-1 hashing and digest comparison
pub mod checksum;
/// Content sniffing and canonical extensions
pub mod classify;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Detection of already-downloaded reports
pub mod presence;
/// Share-page parsing and download URL construction
pub mod resolver;
/// Streaming HTTP transfer to disk
pub mod transfer;
/// Core types and events
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, SourceConfig};
pub use downloader::ReportDownloader;
pub use error::{DownloadError, Error, Result};
pub use types::{
    BatchSummary, DownloadTarget, Event, ItemReport, MediaType, ReportRecord, Stage,
    TransferOutcome,
};
