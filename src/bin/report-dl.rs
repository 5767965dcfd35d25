//! Command-line entry point: download every report in the catalog.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use report_dl::{Config, ReportDownloader};
use tracing_subscriber::EnvFilter;

/// Download and verify every report listed in a report catalog.
#[derive(Debug, Parser)]
#[command(name = "report-dl")]
#[command(about = "Concurrent, checksum-verified report downloader", long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root directory; reports land in `<DIR>/<year>/`.
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Maximum number of simultaneous file transfers.
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// URL of the JSON report catalog.
    #[arg(long, value_name = "URL")]
    catalog_url: Option<String>,
}

impl Cli {
    fn into_config(self) -> report_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(dir) = self.download_dir {
            config.download.download_dir = dir;
        }
        if let Some(n) = self.concurrency {
            config.download.max_concurrent_downloads = n;
        }
        if let Some(url) = self.catalog_url {
            config.source.catalog_url = url;
        }
        Ok(config)
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let downloader = match Cli::parse().into_config().and_then(ReportDownloader::new) {
        Ok(downloader) => downloader,
        Err(err) => {
            eprintln!("report-dl error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let summary = downloader.run_catalog().await;
    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "{} reports: {} downloaded, {} already present, {} failed ({:.1}s)",
        summary.total(),
        summary.succeeded,
        summary.skipped,
        summary.failed,
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
