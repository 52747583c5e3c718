//! Application state.

use std::sync::Arc;

use dfscan_media::{check_ffmpeg, check_ffprobe, DeepfakeDetector};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub detector: Arc<DeepfakeDetector>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Verifies the FFmpeg toolchain is present and loads both ONNX models
    /// up front, so a misconfigured deployment fails at startup rather than
    /// on the first request.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        check_ffmpeg()?;
        check_ffprobe()?;

        let detector = DeepfakeDetector::new(config.detector.clone())?;

        Ok(Self {
            config,
            detector: Arc::new(detector),
        })
    }
}
