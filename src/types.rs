//! Core types for report-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DownloadError, Error, Result};

/// One report artifact as published in the metadata catalog
///
/// Field names follow the catalog's JSON keys. Records are read-only once
/// ingested; call [`ReportRecord::validate`] before handing them to a pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Publication date as printed in the catalog
    #[serde(rename = "Date")]
    pub date: String,
    /// Report title
    #[serde(rename = "Title")]
    pub title: String,
    /// Publication year; doubles as the destination sub-directory
    #[serde(rename = "Year")]
    pub year: String,
    /// Publishing organisation
    #[serde(rename = "Source")]
    pub source: String,
    /// Preview (splash) page that embeds the shared-item configuration
    #[serde(rename = "Link")]
    pub link: String,
    /// Destination file name, usually without extension
    #[serde(rename = "Filename")]
    pub filename: String,
    /// Expected SHA-1 of the file content, hex encoded
    #[serde(rename = "SHA-1")]
    pub checksum: String,
}

impl ReportRecord {
    /// Reject records the pipeline could not process safely
    ///
    /// `year` and `filename` become path components, so both must be a single
    /// normal component. `link` must be an absolute http(s) URL and `checksum`
    /// exactly 40 hex digits.
    pub fn validate(&self) -> Result<()> {
        self.check_path_component("Year", &self.year)?;
        self.check_path_component("Filename", &self.filename)?;

        match url::Url::parse(&self.link) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(self.invalid("Link", format!("has unsupported scheme '{}'", url.scheme())));
            }
            Err(e) => return Err(self.invalid("Link", format!("is not a valid URL: {e}"))),
        }

        if self.checksum.len() != 40 || !self.checksum.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.invalid("SHA-1", "must be 40 hexadecimal characters"));
        }

        Ok(())
    }

    /// Destination of this record beneath `download_dir`
    pub fn target(&self, download_dir: &Path) -> DownloadTarget {
        let directory = download_dir.join(&self.year);
        let base_path = directory.join(&self.filename);
        DownloadTarget {
            directory,
            base_path,
        }
    }

    fn check_path_component(&self, field: &'static str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(self.invalid(field, "must not be empty"));
        }
        if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
            return Err(self.invalid(field, "must be a single path component"));
        }
        Ok(())
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> Error {
        Error::InvalidRecord {
            filename: self.filename.clone(),
            field,
            reason: reason.into(),
        }
    }
}

/// Where a record lands on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTarget {
    /// `<download_dir>/<year>`
    pub directory: PathBuf,
    /// `<download_dir>/<year>/<filename>`, before any extension is appended
    pub base_path: PathBuf,
}

/// Pipeline stage a failure is attributed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Splash page fetch and download URL derivation
    Resolve,
    /// Streaming the file to disk
    Transfer,
    /// Checksum comparison
    Verify,
    /// Content sniffing and extension finalization
    Classify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Resolve => "resolve",
            Stage::Transfer => "transfer",
            Stage::Verify => "verify",
            Stage::Classify => "classify",
        };
        f.write_str(name)
    }
}

/// Media type detected from file content
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// PDF document
    Pdf,
    /// Office Open XML spreadsheet
    Xlsx,
    /// Office Open XML word processing document
    Docx,
    /// Any other ZIP container
    Zip,
    /// HTML page (typically an error or login page served instead of the file)
    Html,
    /// Nothing recognised
    Unknown,
}

impl MediaType {
    /// MIME type string
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            MediaType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            MediaType::Zip => "application/zip",
            MediaType::Html => "text/html",
            MediaType::Unknown => "application/octet-stream",
        }
    }
}

/// Terminal result of one item pipeline run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// A file for this record was already on disk; nothing was requested
    Skipped {
        /// The entry that satisfied the presence check
        existing: PathBuf,
    },
    /// Downloaded, verified and finalized
    Success {
        /// Path after any extension was appended
        final_path: PathBuf,
        /// Type detected from the content
        media_type: MediaType,
    },
    /// The pipeline stopped at `stage`
    Failed {
        /// Stage that failed
        stage: Stage,
        /// What went wrong
        error: DownloadError,
    },
}

impl TransferOutcome {
    /// Whether this outcome is a failure
    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed { .. })
    }

    pub(crate) fn failed(stage: Stage, error: DownloadError) -> Self {
        TransferOutcome::Failed { stage, error }
    }
}

/// Outcome of one record within a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemReport {
    /// The record that was processed
    pub record: ReportRecord,
    /// How it ended
    pub outcome: TransferOutcome,
}

/// Aggregated result of a batch run
#[derive(Clone, Debug)]
pub struct BatchSummary {
    /// One entry per input record, in completion order
    pub items: Vec<ItemReport>,
    /// Items downloaded and verified in this run
    pub succeeded: usize,
    /// Items already present on disk
    pub skipped: usize,
    /// Items that failed at any stage
    pub failed: usize,
    /// Highest number of simultaneous transfers observed
    pub peak_concurrent_transfers: usize,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the last item reached a terminal state
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    pub(crate) fn from_items(
        items: Vec<ItemReport>,
        peak_concurrent_transfers: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut succeeded = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for item in &items {
            match item.outcome {
                TransferOutcome::Success { .. } => succeeded += 1,
                TransferOutcome::Skipped { .. } => skipped += 1,
                TransferOutcome::Failed { .. } => failed += 1,
            }
        }
        Self {
            items,
            succeeded,
            skipped,
            failed,
            peak_concurrent_transfers,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Total number of items processed
    pub fn total(&self) -> usize {
        self.items.len()
    }
}

/// Event emitted during a batch run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A file for the record already exists
    Skipped {
        /// Record filename
        filename: String,
        /// Existing entry
        existing: PathBuf,
    },
    /// Splash page is being fetched and parsed
    Resolving {
        /// Record filename
        filename: String,
    },
    /// Transfer started (permit acquired)
    Downloading {
        /// Record filename
        filename: String,
        /// Direct download URL
        url: String,
    },
    /// Checksum matched
    Verified {
        /// Record filename
        filename: String,
        /// Bytes written
        bytes: u64,
    },
    /// Item finished successfully
    Complete {
        /// Record filename
        filename: String,
        /// Final path on disk
        path: PathBuf,
        /// Detected media type
        media_type: MediaType,
    },
    /// Item failed
    Failed {
        /// Record filename
        filename: String,
        /// Stage that failed
        stage: Stage,
        /// Machine-readable error code
        code: String,
        /// Human-readable error
        error: String,
    },
    /// All items reached a terminal state
    BatchComplete {
        /// Items downloaded
        succeeded: usize,
        /// Items skipped
        skipped: usize,
        /// Items failed
        failed: usize,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ReportRecord {
        ReportRecord {
            date: "01/15/2021".into(),
            title: "Operation Example".into(),
            year: "2021".into(),
            source: "Example Labs".into(),
            link: "https://app.box.com/s/abc123".into(),
            filename: "report1".into(),
            checksum: "0123456789abcdef0123456789ABCDEF01234567".into(),
        }
    }

    #[test]
    fn record_deserializes_from_catalog_keys() {
        let json = r#"{
            "Date": "01/15/2021",
            "Title": "Operation Example",
            "Year": "2021",
            "Source": "Example Labs",
            "Link": "https://app.box.com/s/abc123",
            "Filename": "report1",
            "SHA-1": "0123456789abcdef0123456789ABCDEF01234567"
        }"#;
        let parsed: ReportRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn valid_record_passes() {
        record().validate().unwrap();
    }

    #[test]
    fn short_checksum_is_rejected() {
        let mut r = record();
        r.checksum = "abc".into();
        match r.validate().unwrap_err() {
            Error::InvalidRecord { field, .. } => assert_eq!(field, "SHA-1"),
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
    }

    #[test]
    fn non_hex_checksum_is_rejected() {
        let mut r = record();
        r.checksum = "z".repeat(40);
        assert!(r.validate().is_err());
    }

    #[test]
    fn traversal_in_filename_or_year_is_rejected() {
        for bad in ["..", "../etc", "a/b", "a\\b", ""] {
            let mut r = record();
            r.filename = bad.into();
            assert!(r.validate().is_err(), "filename {bad:?} should be rejected");

            let mut r = record();
            r.year = bad.into();
            assert!(r.validate().is_err(), "year {bad:?} should be rejected");
        }
    }

    #[test]
    fn non_http_link_is_rejected() {
        let mut r = record();
        r.link = "file:///etc/passwd".into();
        match r.validate().unwrap_err() {
            Error::InvalidRecord { field, .. } => assert_eq!(field, "Link"),
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
    }

    #[test]
    fn target_is_year_then_filename() {
        let target = record().target(Path::new("/data"));
        assert_eq!(target.directory, PathBuf::from("/data/2021"));
        assert_eq!(target.base_path, PathBuf::from("/data/2021/report1"));
    }

    #[test]
    fn summary_counts_each_outcome_kind() {
        let items = vec![
            ItemReport {
                record: record(),
                outcome: TransferOutcome::Skipped {
                    existing: PathBuf::from("2021/report1.pdf"),
                },
            },
            ItemReport {
                record: record(),
                outcome: TransferOutcome::Success {
                    final_path: PathBuf::from("2021/report2.pdf"),
                    media_type: MediaType::Pdf,
                },
            },
            ItemReport {
                record: record(),
                outcome: TransferOutcome::failed(
                    Stage::Resolve,
                    DownloadError::malformed("no script"),
                ),
            },
        ];
        let summary = BatchSummary::from_items(items, 1, Utc::now());
        assert_eq!(summary.total(), 3);
        assert_eq!(
            (summary.succeeded, summary.skipped, summary.failed),
            (1, 1, 1)
        );
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::Failed {
            filename: "report1".into(),
            stage: Stage::Verify,
            code: "checksum_mismatch".into(),
            error: "mismatch".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["stage"], "verify");
    }
}
