#![deny(unreachable_patterns)]
//! FFmpeg plumbing, feature extraction, and ONNX deepfake scoring.
//!
//! This crate provides:
//! - Type-safe FFmpeg/FFprobe command building with timeouts
//! - Equally-spaced frame sampling into request-scoped artifacts
//! - Audio track extraction to canonical mono 16 kHz PCM
//! - Fixed-window MFCC feature computation
//! - ONNX-backed visual and audio classifiers behind trait seams
//! - Score fusion and the `DeepfakeDetector` orchestrator

pub mod audio;
pub mod command;
pub mod detection;
pub mod error;
pub mod frames;
pub mod mfcc;
pub mod probe;

pub use audio::{AudioExtractor, AudioSource, Waveform};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use detection::classifier::{
    ImageClassifier, ImageClassifierConfig, OnnxImageClassifier, OnnxSpectrogramClassifier,
    SpectrogramClassifier,
};
pub use detection::detector::{DeepfakeDetector, DetectorConfig};
pub use detection::fusion::{combine, Fusion, AUDIO_WEIGHT, VISUAL_WEIGHT};
pub use detection::{AudioScorer, VisualScorer};
pub use error::{MediaError, MediaResult};
pub use frames::FrameSampler;
pub use mfcc::{MfccConfig, MfccExtractor};
pub use probe::{probe_video, VideoInfo};
