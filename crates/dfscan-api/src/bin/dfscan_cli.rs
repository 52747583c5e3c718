//! Command-line analysis of local video files.
//!
//! Usage: `dfscan-cli <video> [<video> ...]`
//!
//! Uses the same configuration environment variables as the server and
//! prints one JSON report per input file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use dfscan_api::ApiConfig;
use dfscan_media::{check_ffmpeg, check_ffprobe, DeepfakeDetector};
use dfscan_models::AnalysisReport;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dfscan=warn".parse()?))
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("Usage: dfscan-cli <video> [<video> ...]");
    }

    check_ffmpeg().context("FFmpeg is required")?;
    check_ffprobe().context("FFprobe is required")?;

    let config = ApiConfig::from_env();
    let detector =
        DeepfakeDetector::new(config.detector).context("Failed to initialize detector")?;

    let mut failures = 0usize;
    for path in &paths {
        let path = Path::new(path);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let started = std::time::Instant::now();
        match detector.analyze(path, &filename).await {
            Ok(result) => {
                let report =
                    AnalysisReport::from_result(&result, started.elapsed().as_secs_f64());
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed", paths.len());
    }
    Ok(())
}
