//! Splash page resolution: preview link → direct download URL
//!
//! Box preview pages embed their application state as a JSON object assigned
//! to a variable inside an inline `<script>`. The shared-item entry of that
//! object carries the two values needed to build a direct download URL.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::error::DownloadError;

/// Key of the shared-item object inside the embedded configuration
pub const SHARED_ITEM_KEY: &str = "/app-api/enduserapp/shared-item";

#[allow(clippy::expect_used)]
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("script block pattern is valid")
});

#[allow(clippy::expect_used)]
static SRC_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsrc\s*=").expect("src attribute pattern is valid"));

/// Fetch the raw bytes of a preview page
pub async fn fetch_splash_page(
    client: &reqwest::Client,
    link: &str,
) -> Result<Vec<u8>, DownloadError> {
    let splash_error = |reason: String| DownloadError::SplashFetch {
        url: link.to_string(),
        reason,
    };

    let response = client
        .get(link)
        .send()
        .await
        .map_err(|e| splash_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(splash_error(format!("HTTP {}", status.as_u16())));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| splash_error(format!("failed to read body: {e}")))?;
    Ok(body.to_vec())
}

/// Derive the direct download URL from a preview page
///
/// Every inline script block and every assignment within it is tried; the
/// first JSON object that carries [`SHARED_ITEM_KEY`] with a usable
/// `sharedName` and `itemID` wins.
pub fn resolve_download_url(html: &[u8], endpoint: &Url) -> Result<Url, DownloadError> {
    let html = String::from_utf8_lossy(html);

    let mut scripts = 0usize;
    let mut last_problem: Option<String> = None;

    for block in SCRIPT_BLOCK.captures_iter(&html) {
        let attributes = block.get(1).map_or("", |m| m.as_str());
        if SRC_ATTRIBUTE.is_match(attributes) {
            continue;
        }
        scripts += 1;

        let Some(body) = block.get(2) else { continue };
        for candidate in embedded_objects(body.as_str()) {
            let Some(shared_item) = candidate.get(SHARED_ITEM_KEY) else {
                continue;
            };
            match shared_item_params(shared_item) {
                Ok((shared_name, item_id)) => {
                    debug!(shared_name = %shared_name, item_id = %item_id, "resolved shared item");
                    return Ok(build_download_url(endpoint, &shared_name, &item_id));
                }
                Err(problem) => last_problem = Some(problem),
            }
        }
    }

    Err(DownloadError::malformed(last_problem.unwrap_or_else(|| {
        if scripts == 0 {
            "no inline script block found".to_string()
        } else {
            format!("no script statement assigns an object containing '{SHARED_ITEM_KEY}'")
        }
    })))
}

/// Build `<endpoint>?rm=box_download_shared_file&shared_name=..&file_id=f_..`
pub fn build_download_url(endpoint: &Url, shared_name: &str, item_id: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("rm", "box_download_shared_file")
        .append_pair("shared_name", shared_name)
        .append_pair("file_id", &format!("f_{item_id}"));
    url
}

/// JSON objects on the right-hand side of assignments in a script
///
/// Parsing starts right after each `=` and stops at the end of the first JSON
/// value, so `;` or `=` inside string values and any trailing statements do
/// not interfere.
fn embedded_objects(script: &str) -> impl Iterator<Item = Value> + '_ {
    let bytes = script.as_bytes();
    script
        .match_indices('=')
        .filter(move |(i, _)| {
            let prev = i.checked_sub(1).map(|p| bytes[p]);
            let next = bytes.get(i + 1).copied();
            !matches!(prev, Some(b'=' | b'!' | b'<' | b'>'))
                && !matches!(next, Some(b'=' | b'>'))
        })
        .filter_map(move |(i, _)| {
            let rhs = script[i + 1..].trim_start();
            if !rhs.starts_with('{') {
                return None;
            }
            serde_json::Deserializer::from_str(rhs)
                .into_iter::<Value>()
                .next()?
                .ok()
                .filter(Value::is_object)
        })
}

fn shared_item_params(shared_item: &Value) -> Result<(String, String), String> {
    let shared_name = shared_item
        .get("sharedName")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "shared item has no sharedName".to_string())?;

    let item_id = match shared_item.get("itemID") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err("shared item has no itemID".to_string()),
    };

    Ok((shared_name.to_string(), item_id))
}
