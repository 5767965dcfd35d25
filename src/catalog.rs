//! Metadata catalog ingestion
//!
//! The catalog is a JSON array of report records published oldest-first.
//! Records are validated here so the pipeline only ever sees well-formed input.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::ReportRecord;

/// Parse and validate a catalog document
///
/// Entries that are not objects, miss a field, or fail
/// [`ReportRecord::validate`] are dropped with a warning. The document itself
/// must be a JSON array.
pub fn parse_catalog(content: &[u8]) -> Result<Vec<ReportRecord>> {
    let entries: Vec<Value> = serde_json::from_slice(content)?;
    let total = entries.len();

    let records: Vec<ReportRecord> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let record = match serde_json::from_value::<ReportRecord>(entry) {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, error = %e, "skipping catalog entry with missing or mistyped fields");
                    return None;
                }
            };
            match record.validate() {
                Ok(()) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "skipping invalid catalog entry");
                    None
                }
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            accepted = records.len(),
            rejected = total - records.len(),
            "catalog contained invalid entries"
        );
    }
    Ok(records)
}

/// Fetch the catalog and return its records, newest first when requested
///
/// Any failure (transport, HTTP status, decoding) is logged and yields an
/// empty list, which makes the batch a no-op.
pub async fn fetch_catalog(
    client: &reqwest::Client,
    url: &str,
    newest_first: bool,
) -> Vec<ReportRecord> {
    match try_fetch_catalog(client, url).await {
        Ok(mut records) => {
            if newest_first {
                records.reverse();
            }
            info!(url, records = records.len(), "loaded report catalog");
            records
        }
        Err(e) => {
            warn!(url, error = %e, "failed to load report catalog");
            Vec::new()
        }
    }
}

async fn try_fetch_catalog(client: &reqwest::Client, url: &str) -> Result<Vec<ReportRecord>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Other(format!(
            "catalog returned HTTP {}: {}",
            status.as_u16(),
            url
        )));
    }
    let content = response.bytes().await?;
    parse_catalog(&content)
}
