//! Item pipeline: one record from presence check to finalized file.
//!
//! Phases:
//! 1. Reject records whose fields are unsafe to turn into paths or URLs
//! 2. Skip if a file for the record already exists
//! 3. Resolve the splash page into a direct download URL
//! 4. Stream the file to disk under the transfer permit
//! 5. Verify the SHA-1, removing the file on mismatch
//! 6. Classify the content and append the canonical extension
//!
//! Every error ends up in the returned [`TransferOutcome`]; nothing escapes
//! to the batch.

use std::path::Path;

use url::Url;

use crate::checksum::digests_match;
use crate::classify::classify_and_finalize;
use crate::error::DownloadError;
use crate::presence::find_existing;
use crate::resolver::{fetch_splash_page, resolve_download_url};
use crate::transfer::{TransferReport, stream_download};
use crate::types::{DownloadTarget, Event, ReportRecord, Stage, TransferOutcome};

use super::ReportDownloader;

impl ReportDownloader {
    /// Run the full pipeline for one record
    ///
    /// Never fails: the returned outcome says whether the record was skipped,
    /// downloaded, or failed and at which stage. Records that do not pass
    /// [`ReportRecord::validate`] fail at [`Stage::Resolve`] without touching
    /// the network or the filesystem.
    pub async fn download_report(&self, record: &ReportRecord) -> TransferOutcome {
        let outcome = self.run_pipeline(record).await;
        self.report_outcome(record, &outcome);
        outcome
    }

    async fn run_pipeline(&self, record: &ReportRecord) -> TransferOutcome {
        // Year and filename become path components beneath download_dir
        if let Err(e) = record.validate() {
            return TransferOutcome::failed(Stage::Resolve, DownloadError::from_validation(e));
        }
        let target = record.target(self.config.download_dir());

        if let Some(existing) = find_existing(&target.base_path) {
            return TransferOutcome::Skipped { existing };
        }

        self.emit_event(Event::Resolving {
            filename: record.filename.clone(),
        });
        let url = match self.resolve(record).await {
            Ok(url) => url,
            Err(e) => return TransferOutcome::failed(Stage::Resolve, e),
        };

        let report = match self.transfer(record, &target, &url).await {
            Ok(report) => report,
            Err(e) => {
                // A pre-existing file belongs to whoever created it
                if !matches!(e, DownloadError::DestinationExists { .. }) {
                    remove_partial(&target.base_path).await;
                }
                return TransferOutcome::failed(Stage::Transfer, e);
            }
        };

        if !digests_match(&record.checksum, &report.digest) {
            remove_partial(&target.base_path).await;
            return TransferOutcome::failed(
                Stage::Verify,
                DownloadError::ChecksumMismatch {
                    path: target.base_path,
                    expected: record.checksum.to_ascii_lowercase(),
                    actual: report.digest,
                },
            );
        }
        self.emit_event(Event::Verified {
            filename: record.filename.clone(),
            bytes: report.bytes_written,
        });

        match classify_and_finalize(&target.base_path).await {
            Ok((final_path, media_type)) => TransferOutcome::Success {
                final_path,
                media_type,
            },
            Err(e) => TransferOutcome::failed(Stage::Classify, e),
        }
    }

    async fn resolve(&self, record: &ReportRecord) -> Result<Url, DownloadError> {
        let page = fetch_splash_page(&self.http, &record.link).await?;
        resolve_download_url(&page, &self.endpoint)
    }

    /// Transfer phase; the permit and gauge guard are released on every exit path
    async fn transfer(
        &self,
        record: &ReportRecord,
        target: &DownloadTarget,
        url: &Url,
    ) -> Result<TransferReport, DownloadError> {
        tokio::fs::create_dir_all(&target.directory)
            .await
            .map_err(|e| {
                DownloadError::transfer(
                    url.as_str(),
                    format!("failed to create {}: {e}", target.directory.display()),
                )
            })?;

        let _permit = self
            .transfer_limit
            .acquire()
            .await
            .map_err(|_| DownloadError::transfer(url.as_str(), "transfer limiter closed"))?;
        let _active = self.transfers.enter();

        self.emit_event(Event::Downloading {
            filename: record.filename.clone(),
            url: url.to_string(),
        });
        tracing::debug!(filename = %record.filename, url = %url, "transfer started");

        stream_download(&self.http, url.as_str(), &target.base_path).await
    }

    fn report_outcome(&self, record: &ReportRecord, outcome: &TransferOutcome) {
        let filename = record.filename.clone();
        match outcome {
            TransferOutcome::Skipped { existing } => {
                tracing::info!(filename = %filename, existing = %existing.display(), "File already exists");
                self.emit_event(Event::Skipped {
                    filename,
                    existing: existing.clone(),
                });
            }
            TransferOutcome::Success {
                final_path,
                media_type,
            } => {
                tracing::info!(
                    filename = %filename,
                    path = %final_path.display(),
                    mime = media_type.mime(),
                    "Successfully downloaded"
                );
                self.emit_event(Event::Complete {
                    filename,
                    path: final_path.clone(),
                    media_type: *media_type,
                });
            }
            TransferOutcome::Failed { stage, error } => {
                tracing::warn!(
                    filename = %filename,
                    link = %record.link,
                    stage = %stage,
                    error = %error,
                    "Download failure"
                );
                self.emit_event(Event::Failed {
                    filename,
                    stage: *stage,
                    code: error.error_code().to_string(),
                    error: error.to_string(),
                });
            }
        }
    }
}

/// Remove a partially written or rejected file; absence is fine
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to remove partial file")
        }
    }
}
