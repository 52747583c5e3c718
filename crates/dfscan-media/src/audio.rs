//! Audio track extraction to canonical mono 16 kHz PCM.
//!
//! The extractor transcodes into a temp file owned by the current analysis
//! and loads the samples into memory. "No audio track" and "audio present
//! but unprocessable" are distinct variants; the orchestrator decides how
//! each degrades the published record.

use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe;

/// Canonical sample rate for the audio pipeline.
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Canonical mono PCM representation of a video's audio track.
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Samples as f32 in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    /// Duration of the waveform in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Result of extracting audio from a video.
#[derive(Debug)]
pub enum AudioSource {
    /// The track was transcoded successfully.
    Waveform(Waveform),
    /// The container has no audio stream.
    NoAudioTrack,
    /// An audio stream exists but transcoding it failed.
    Failed { reason: String },
}

/// Extracts a video's audio track as mono 16 kHz f32 PCM.
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    /// Per-invocation FFmpeg timeout in seconds.
    timeout_secs: u64,
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioExtractor {
    pub fn new() -> Self {
        Self { timeout_secs: 120 }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Extract the audio track, if any.
    ///
    /// Only `SourceNotFound` is a hard error; everything else is reported
    /// through the `AudioSource` variants so a dead audio pipeline never
    /// blocks a visual-only verdict.
    pub async fn extract(&self, video: impl AsRef<Path>) -> MediaResult<AudioSource> {
        let video = video.as_ref();

        if !video.exists() {
            return Err(MediaError::SourceNotFound(video.to_path_buf()));
        }

        // Request-scoped artifact: deleted when the handle drops.
        let pcm_file = NamedTempFile::new()?;

        let cmd = FfmpegCommand::new(video, pcm_file.path())
            .no_video()
            .audio_rate(AUDIO_SAMPLE_RATE)
            .audio_channels(1)
            .format("f32le");

        let run = FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run(&cmd)
            .await;

        if let Err(e) = run {
            // Distinguish a genuinely silent container from a broken track.
            let has_track = probe::probe_video(video)
                .await
                .map(|info| info.has_audio)
                .unwrap_or(false);

            return Ok(if has_track {
                AudioSource::Failed {
                    reason: e.to_string(),
                }
            } else {
                AudioSource::NoAudioTrack
            });
        }

        let samples = load_samples(pcm_file.path()).await?;
        if samples.is_empty() {
            return Ok(AudioSource::NoAudioTrack);
        }

        debug!(
            path = %video.display(),
            samples = samples.len(),
            duration_secs = samples.len() as f64 / AUDIO_SAMPLE_RATE as f64,
            "Audio track extracted"
        );

        Ok(AudioSource::Waveform(Waveform {
            samples,
            sample_rate: AUDIO_SAMPLE_RATE,
        }))
    }
}

/// Load raw f32le samples from a file.
async fn load_samples(path: &Path) -> MediaResult<Vec<f32>> {
    let bytes = tokio::fs::read(path).await?;

    // 4 bytes per sample, little-endian.
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_duration() {
        let wf = Waveform {
            samples: vec![0.0; 48_000],
            sample_rate: AUDIO_SAMPLE_RATE,
        };
        assert!((wf.duration_secs() - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let extractor = AudioExtractor::new();
        let err = extractor.extract("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_samples_empty_file() {
        let temp = NamedTempFile::new().unwrap();
        let samples = load_samples(temp.path()).await.unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_load_samples_with_data() {
        let temp = NamedTempFile::new().unwrap();

        let test_samples: Vec<f32> = vec![0.0, 0.5, 1.0, -1.0];
        let bytes: Vec<u8> = test_samples.iter().flat_map(|f| f.to_le_bytes()).collect();
        tokio::fs::write(temp.path(), &bytes).await.unwrap();

        let loaded = load_samples(temp.path()).await.unwrap();
        assert_eq!(loaded.len(), 4);
        assert!((loaded[1] - 0.5).abs() < 1e-6);
        assert!((loaded[3] - (-1.0)).abs() < 1e-6);
    }
}
