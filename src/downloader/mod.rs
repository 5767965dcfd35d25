//! Core downloader implementation split into focused submodules.
//!
//! The `ReportDownloader` struct and its methods are organized by concern:
//! - [`item_task`] - Per-record pipeline (presence check, resolve, transfer, verify, classify)
//! - [`batch`] - Fan-out over many records and outcome aggregation

mod batch;
mod item_task;


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Event, ReportRecord};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Counts transfers in flight and remembers the highest count seen
#[derive(Clone, Default)]
pub(crate) struct TransferGauge {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl TransferGauge {
    /// Register a transfer; it is deregistered when the guard drops
    pub(crate) fn enter(&self) -> TransferGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        TransferGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Restart peak tracking from the current in-flight count
    pub(crate) fn reset_peak(&self) {
        self.peak.store(self.active(), Ordering::SeqCst);
    }
}

pub(crate) struct TransferGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped or cheap handles)
#[derive(Clone)]
pub struct ReportDownloader {
    /// Shared HTTP client for splash pages and transfers
    pub(crate) http: reqwest::Client,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Parsed download endpoint
    pub(crate) endpoint: Arc<url::Url>,
    /// Semaphore bounding simultaneous transfers (respects max_concurrent_downloads)
    pub(crate) transfer_limit: Arc<tokio::sync::Semaphore>,
    /// In-flight transfer instrumentation
    pub(crate) transfers: TransferGauge,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl ReportDownloader {
    /// Create a downloader with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.download.request_timeout)
            .connect_timeout(config.download.connect_timeout)
            .user_agent(config.download.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Self::with_client(config, http)
    }

    /// Create a downloader that reuses an existing HTTP client
    pub fn with_client(config: Config, http: reqwest::Client) -> Result<Self> {
        config.validate()?;

        let endpoint = url::Url::parse(&config.source.download_endpoint).map_err(|e| {
            Error::Config {
                message: format!("invalid download endpoint: {}", e),
                key: Some("download_endpoint".to_string()),
            }
        })?;
        let transfer_limit = Arc::new(tokio::sync::Semaphore::new(
            config.download.max_concurrent_downloads,
        ));
        let (event_tx, _) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            http,
            config: Arc::new(config),
            endpoint: Arc::new(endpoint),
            transfer_limit,
            transfers: TransferGauge::default(),
            event_tx,
        })
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of transfers currently holding a permit
    pub fn active_transfers(&self) -> usize {
        self.transfers.active()
    }

    /// Fetch the configured catalog (empty on failure)
    pub async fn load_catalog(&self) -> Vec<ReportRecord> {
        catalog::fetch_catalog(
            &self.http,
            &self.config.source.catalog_url,
            self.config.source.newest_first,
        )
        .await
    }

    /// Emit an event; having no subscribers is fine
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
