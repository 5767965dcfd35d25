//! Content classification and extension finalization
//!
//! The media type is sniffed from the bytes on disk, never from the name. Only
//! types in [`EXTENSIONS`] cause a rename; everything else is left untouched.

use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::types::MediaType;

/// Canonical extension for each media type the classifier relabels
pub const EXTENSIONS: &[(MediaType, &str)] = &[
    (MediaType::Pdf, ".pdf"),
    (MediaType::Xlsx, ".xlsx"),
    (MediaType::Docx, ".docx"),
];

/// How far into the file the PDF header may appear
const PDF_HEADER_WINDOW: usize = 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Canonical extension for a media type, if it has one
pub fn extension_for(media_type: MediaType) -> Option<&'static str> {
    EXTENSIONS
        .iter()
        .find(|(t, _)| *t == media_type)
        .map(|(_, ext)| *ext)
}

/// Sniff the media type of a file
///
/// Blocking; run through `spawn_blocking` from async code.
pub fn detect_media_type(path: &Path) -> std::io::Result<MediaType> {
    let mut head = Vec::with_capacity(PDF_HEADER_WINDOW);
    std::fs::File::open(path)?
        .take(PDF_HEADER_WINDOW as u64)
        .read_to_end(&mut head)?;

    if head.starts_with(ZIP_MAGIC) {
        return Ok(detect_zip_flavor(path));
    }
    if head
        .windows(PDF_MAGIC.len())
        .any(|window| window == PDF_MAGIC)
    {
        return Ok(MediaType::Pdf);
    }
    if looks_like_html(&head) {
        return Ok(MediaType::Html);
    }
    Ok(MediaType::Unknown)
}

/// Tell OOXML documents apart from plain ZIP archives by their part names
fn detect_zip_flavor(path: &Path) -> MediaType {
    let archive = std::fs::File::open(path)
        .map_err(zip::result::ZipError::Io)
        .and_then(zip::ZipArchive::new);
    let mut archive = match archive {
        Ok(a) => a,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ZIP header but unreadable archive");
            return MediaType::Zip;
        }
    };

    if archive.by_name("xl/workbook.xml").is_ok() {
        MediaType::Xlsx
    } else if archive.by_name("word/document.xml").is_ok() {
        MediaType::Docx
    } else {
        MediaType::Zip
    }
}

fn looks_like_html(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
    text.starts_with("<!doctype html") || text.starts_with("<html")
}

/// Sniff `path` and append the canonical extension when it is missing
///
/// Returns the final path and the detected type. Content that cannot be read
/// or is not recognised leaves the path unchanged; only a failed rename is an
/// error.
///
/// The existing-extension check ignores ASCII case, so `report.PDF` is kept
/// as is rather than becoming `report.PDF.pdf`.
pub async fn classify_and_finalize(path: &Path) -> Result<(PathBuf, MediaType), DownloadError> {
    let sniff_path = path.to_path_buf();
    let detected = tokio::task::spawn_blocking(move || detect_media_type(&sniff_path)).await;
    let media_type = match detected {
        Ok(Ok(media_type)) => media_type,
        Ok(Err(e)) => {
            warn!(path = %path.display(), error = %e, "could not read file for classification");
            MediaType::Unknown
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "classification task failed");
            MediaType::Unknown
        }
    };

    let Some(ext) = extension_for(media_type) else {
        debug!(path = %path.display(), mime = media_type.mime(), "no canonical extension, keeping name");
        return Ok((path.to_path_buf(), media_type));
    };

    let current = path.as_os_str().to_string_lossy();
    if current.to_ascii_lowercase().ends_with(ext) {
        return Ok((path.to_path_buf(), media_type));
    }

    let mut renamed = path.as_os_str().to_os_string();
    renamed.push(ext);
    let renamed = PathBuf::from(renamed);

    tokio::fs::rename(path, &renamed)
        .await
        .map_err(|e| DownloadError::Rename {
            from: path.to_path_buf(),
            to: renamed.clone(),
            reason: e.to_string(),
        })?;

    debug!(from = %path.display(), to = %renamed.display(), "appended canonical extension");
    Ok((renamed, media_type))
}
