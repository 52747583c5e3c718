//! API configuration.

use dfscan_media::DetectorConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max upload body size in bytes
    pub max_upload_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Detector settings
    pub detector: DetectorConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_upload_size: 100 * 1024 * 1024, // 100MB
            environment: "development".to_string(),
            detector: DetectorConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = DetectorConfig::default();

        let detector = DetectorConfig {
            visual_model_path: std::env::var("VISUAL_MODEL_PATH")
                .unwrap_or(defaults.visual_model_path),
            audio_model_path: std::env::var("AUDIO_MODEL_PATH")
                .unwrap_or(defaults.audio_model_path),
            frames_per_video: std::env::var("FRAMES_PER_VIDEO")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frames_per_video),
            ffmpeg_timeout_secs: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ffmpeg_timeout_secs),
            max_concurrent_inference: std::env::var("MAX_CONCURRENT_INFERENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_inference),
            visual_input_size: defaults.visual_input_size,
            mfcc: defaults.mfcc,
        };

        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            detector,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.detector.frames_per_video, 20);
        assert!(!config.is_production());
    }

    #[test]
    fn test_from_env_overrides_and_fallbacks() {
        // Set and unset in one test; env vars are process-global.
        std::env::set_var("API_PORT", "9100");
        std::env::set_var("FRAMES_PER_VIDEO", "8");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 9100);
        assert_eq!(config.detector.frames_per_video, 8);

        std::env::remove_var("API_PORT");
        std::env::remove_var("FRAMES_PER_VIDEO");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 8000);
        assert_eq!(config.detector.frames_per_video, 20);
    }

    #[test]
    fn test_from_env_ignores_unparseable_values() {
        std::env::set_var("MAX_UPLOAD_SIZE", "not-a-number");
        let config = ApiConfig::from_env();
        assert_eq!(config.max_upload_size, 100 * 1024 * 1024);
        std::env::remove_var("MAX_UPLOAD_SIZE");
    }
}
