//! Error types for media and detection operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during analysis.
///
/// `SourceNotFound` and `SourceUnreadable` are fatal for the whole input and
/// abort the analysis. Everything else is modality-internal and is absorbed
/// by the orchestrator into a degraded outcome.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source cannot be opened: {0}")]
    SourceUnreadable(String),

    #[error("Audio transcode failed: {message}")]
    TranscodeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a source-unreadable error.
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::SourceUnreadable(message.into())
    }

    /// Create a transcode failure error.
    pub fn transcode_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::TranscodeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an inference error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True if this error aborts the whole analysis rather than degrading
    /// one modality.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::SourceUnreadable(_)
                | Self::FfmpegNotFound
                | Self::FfprobeNotFound
        )
    }
}
