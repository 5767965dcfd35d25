//! Streaming transfer of a single file with incremental hashing

use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::checksum::ChecksumVerifier;
use crate::error::DownloadError;

/// Result of a completed transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReport {
    /// Bytes written to the destination
    pub bytes_written: u64,
    /// Lowercase hex SHA-1 of everything written
    pub digest: String,
}

/// Stream `url` into a newly created file at `destination`
///
/// The destination is created with create-new semantics, so an existing file
/// is reported as [`DownloadError::DestinationExists`] and left alone. Each
/// chunk goes to the digest first, then to disk. On any later failure the
/// handle is dropped and the partial file is left for the caller to remove.
pub async fn stream_download(
    client: &reqwest::Client,
    url: &str,
    destination: &Path,
) -> Result<TransferReport, DownloadError> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::transfer(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::transfer(
            url,
            format!("HTTP {}", status.as_u16()),
        ));
    }

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                DownloadError::DestinationExists {
                    path: destination.to_path_buf(),
                }
            } else {
                DownloadError::transfer(
                    url,
                    format!("failed to create {}: {e}", destination.display()),
                )
            }
        })?;

    let expected_len = response.content_length();
    let mut verifier = ChecksumVerifier::new();
    loop {
        let chunk = response
            .chunk()
            .await
            .map_err(|e| DownloadError::transfer(url, format!("stream interrupted: {e}")))?;
        let Some(chunk) = chunk else { break };

        verifier.update(&chunk);
        file.write_all(&chunk).await.map_err(|e| {
            DownloadError::transfer(url, format!("failed to write {}: {e}", destination.display()))
        })?;
    }

    file.flush().await.map_err(|e| {
        DownloadError::transfer(url, format!("failed to flush {}: {e}", destination.display()))
    })?;
    drop(file);

    let bytes_written = verifier.bytes_hashed();
    if let Some(expected) = expected_len
        && expected != bytes_written
    {
        return Err(DownloadError::transfer(
            url,
            format!("truncated stream: expected {expected} bytes, received {bytes_written}"),
        ));
    }

    let digest = verifier.finalize_hex();
    debug!(url, bytes = bytes_written, digest = %digest, "transfer finished");
    Ok(TransferReport {
        bytes_written,
        digest,
    })
}
