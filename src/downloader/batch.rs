//! Batch orchestration: fan out item pipelines and aggregate their outcomes.

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::types::{BatchSummary, Event, ItemReport, ReportRecord};

use super::ReportDownloader;

impl ReportDownloader {
    /// Run the pipeline for every record and wait for all of them
    ///
    /// Up to `max_pending_items` pipelines are dispatched at once; of those, at
    /// most `max_concurrent_downloads` are in the transfer phase at any instant.
    /// Failures never stop the batch. Items are reported in completion order.
    pub async fn run_batch(&self, records: Vec<ReportRecord>) -> BatchSummary {
        let started_at = Utc::now();
        self.transfers.reset_peak();

        tracing::info!(
            records = records.len(),
            max_concurrent_downloads = self.config.download.max_concurrent_downloads,
            "starting batch"
        );

        let items: Vec<ItemReport> = stream::iter(records)
            .map(move |record| async move {
                let outcome = self.download_report(&record).await;
                ItemReport { record, outcome }
            })
            .buffer_unordered(self.config.download.max_pending_items)
            .collect()
            .await;

        let summary = BatchSummary::from_items(items, self.transfers.peak(), started_at);

        tracing::info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            peak_concurrent_transfers = summary.peak_concurrent_transfers,
            "batch complete"
        );
        self.emit_event(Event::BatchComplete {
            succeeded: summary.succeeded,
            skipped: summary.skipped,
            failed: summary.failed,
        });

        summary
    }

    /// Load the configured catalog and download everything in it
    pub async fn run_catalog(&self) -> BatchSummary {
        let records = self.load_catalog().await;
        self.run_batch(records).await
    }
}
