//! Common test utilities for report-dl integration tests

#![allow(dead_code)]

use std::io::Write;
use std::time::Duration;

use report_dl::checksum::ChecksumVerifier;
use report_dl::{Config, ReportDownloader, ReportRecord};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Smallest body the content sniffer recognizes as a PDF
pub const PDF_BODY: &[u8] =
    b"%PDF-1.5\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";

/// Lowercase hex SHA-1 of `bytes`
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut verifier = ChecksumVerifier::new();
    verifier.update(bytes);
    verifier.finalize_hex()
}

/// Box-style share page carrying the shared item in an inline script
pub fn splash_page(shared_name: &str, item_id: u64) -> String {
    format!(
        r#"<html><head>
<script src="/static/app.js"></script>
<script>
  if (window.Box == null) {{ window.Box = {{}}; }}
  Box.config = {{"locale": "en-US"}};
  Box.postStreamData = {{"/app-api/enduserapp/shared-item": {{"sharedName": "{shared_name}", "itemID": {item_id}, "itemType": "file"}}}};
</script>
</head><body></body></html>"#
    )
}

/// Zip archive containing the given entry names, each with placeholder XML
pub fn ooxml_body(entries: &[&str]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for name in entries {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"<?xml version=\"1.0\"?><root/>").unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Mock share host plus a scratch download directory
pub struct BoxHarness {
    pub server: MockServer,
    pub dir: TempDir,
}

impl BoxHarness {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Config pointing the download endpoint and catalog at the mock server
    pub fn config(&self, max_concurrent_downloads: usize) -> Config {
        let mut config = Config::default();
        config.download.download_dir = self.dir.path().to_path_buf();
        config.download.max_concurrent_downloads = max_concurrent_downloads;
        config.source.download_endpoint = format!("{}/index.php", self.server.uri());
        config.source.catalog_url = format!("{}/APTnotes.json", self.server.uri());
        config
    }

    pub fn downloader(&self, max_concurrent_downloads: usize) -> ReportDownloader {
        ReportDownloader::new(self.config(max_concurrent_downloads)).unwrap()
    }

    /// Publish a report: share page at `/s/<shared_name>`, file behind the endpoint
    pub async fn publish(&self, shared_name: &str, item_id: u64, body: &[u8], delay: Duration) {
        Mock::given(method("GET"))
            .and(path(format!("/s/{shared_name}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(splash_page(shared_name, item_id)),
            )
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/index.php"))
            .and(query_param("shared_name", shared_name))
            .and(query_param("file_id", format!("f_{item_id}").as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body.to_vec())
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Serve `records` as the catalog, oldest first
    pub async fn publish_catalog(&self, records: &[ReportRecord]) {
        Mock::given(method("GET"))
            .and(path("/APTnotes.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(records))
            .mount(&self.server)
            .await;
    }

    pub fn record(
        &self,
        shared_name: &str,
        year: &str,
        filename: &str,
        checksum: String,
    ) -> ReportRecord {
        ReportRecord {
            date: format!("01/01/{year}"),
            title: format!("{filename} campaign analysis"),
            year: year.to_string(),
            source: "Example Research".to_string(),
            link: format!("{}/s/{shared_name}", self.server.uri()),
            filename: filename.to_string(),
            checksum,
        }
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}
