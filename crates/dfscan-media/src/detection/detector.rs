//! The analysis orchestrator: both modality pipelines, fused into a record.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use dfscan_models::{round4, AnalysisResult, ModalityOutcome};

use crate::audio::AudioExtractor;
use crate::detection::audio::{AudioScore, AudioScorer};
use crate::detection::classifier::{
    ImageClassifier, ImageClassifierConfig, OnnxImageClassifier, OnnxSpectrogramClassifier,
    SpectrogramClassifier,
};
use crate::detection::fusion;
use crate::detection::visual::{VisualScore, VisualScorer};
use crate::error::MediaResult;
use crate::frames::FrameSampler;
use crate::mfcc::{MfccConfig, MfccExtractor};

/// Detector configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the visual ONNX model
    pub visual_model_path: String,
    /// Path to the audio ONNX model
    pub audio_model_path: String,
    /// Target number of equally-spaced frames per video
    pub frames_per_video: u32,
    /// Square input size of the visual model
    pub visual_input_size: u32,
    /// MFCC parameters for the audio model
    pub mfcc: MfccConfig,
    /// Per-FFmpeg-invocation timeout in seconds
    pub ffmpeg_timeout_secs: u64,
    /// Maximum concurrent blocking inference tasks
    pub max_concurrent_inference: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            visual_model_path: "models/deepfake_visual.onnx".to_string(),
            audio_model_path: "models/deepfake_audio.onnx".to_string(),
            frames_per_video: 20,
            visual_input_size: 224,
            mfcc: MfccConfig::default(),
            ffmpeg_timeout_secs: 120,
            max_concurrent_inference: 2,
        }
    }
}

/// Multi-modal deepfake detector.
///
/// Runs the visual and audio pipelines concurrently and fuses their scores.
/// A degraded modality never aborts the analysis: a degraded visual channel
/// contributes 0.0 and a degraded (but present) audio channel contributes a
/// neutral 0.5. Only an unreadable source fails the whole analysis.
pub struct DeepfakeDetector {
    visual: VisualScorer,
    audio: AudioScorer,
}

impl DeepfakeDetector {
    /// Build a detector with ONNX classifiers loaded from the configured
    /// model paths.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        let visual_classifier = OnnxImageClassifier::new(ImageClassifierConfig {
            model_path: config.visual_model_path.clone(),
            input_size: config.visual_input_size,
        })?;
        let audio_classifier = OnnxSpectrogramClassifier::new(&config.audio_model_path)?;

        Ok(Self::with_classifiers(
            config,
            Arc::new(visual_classifier),
            Arc::new(audio_classifier),
        ))
    }

    /// Build a detector with caller-provided classifiers.
    pub fn with_classifiers(
        config: DetectorConfig,
        visual_classifier: Arc<dyn ImageClassifier>,
        audio_classifier: Arc<dyn SpectrogramClassifier>,
    ) -> Self {
        let inference_permits = Arc::new(Semaphore::new(config.max_concurrent_inference.max(1)));

        let visual = VisualScorer::new(
            FrameSampler::new().with_timeout(config.ffmpeg_timeout_secs),
            visual_classifier,
            config.frames_per_video,
            Arc::clone(&inference_permits),
        );

        let audio = AudioScorer::new(
            AudioExtractor::new().with_timeout(config.ffmpeg_timeout_secs),
            Arc::new(MfccExtractor::new(config.mfcc.clone())),
            audio_classifier,
            inference_permits,
        );

        Self { visual, audio }
    }

    /// Analyze one video and produce the fused record.
    ///
    /// `filename` is the name published in the record, independent of the
    /// request-scoped path the bytes live at.
    pub async fn analyze(&self, video: &Path, filename: &str) -> MediaResult<AnalysisResult> {
        let started = Instant::now();

        // The pipelines are independent; run them concurrently.
        let (visual, audio) = tokio::join!(self.visual.score(video), self.audio.score(video));
        let result = publish(filename, visual?, audio?);

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("dfscan_analysis_duration_seconds").record(elapsed);
        metrics::counter!(
            "dfscan_analyses_total",
            "verdict" => if result.verdict { "fake" } else { "real" }
        )
        .increment(1);

        info!(
            filename = %result.filename,
            verdict = result.verdict,
            fake_probability = result.fake_probability,
            confidence = result.confidence,
            frames_analyzed = result.frames_analyzed,
            has_audio = result.has_audio,
            elapsed_secs = elapsed,
            "Analysis completed"
        );

        Ok(result)
    }
}

/// Assemble the published record from the two modality outcomes.
///
/// Fusion runs at full precision; only the published fields are rounded.
fn publish(filename: &str, visual: VisualScore, audio: AudioScore) -> AnalysisResult {
    let visual_prob = match visual.outcome {
        ModalityOutcome::Scored { probability } => probability,
        ModalityOutcome::Degraded { reason } => {
            warn!(reason = reason.as_str(), "Visual modality degraded to 0.0");
            0.0
        }
    };

    // A missing track drops the audio term entirely; a broken track is
    // present but uninformative, so it contributes a neutral 0.5.
    let audio_prob = if !audio.has_audio {
        None
    } else {
        Some(match audio.outcome {
            ModalityOutcome::Scored { probability } => probability,
            ModalityOutcome::Degraded { reason } => {
                warn!(reason = reason.as_str(), "Audio modality degraded to 0.5");
                0.5
            }
        })
    };

    let fused = fusion::combine(visual_prob, audio_prob);

    let result = AnalysisResult {
        filename: filename.to_string(),
        verdict: fused.verdict,
        fake_probability: round4(fused.fake_probability),
        confidence: round4(fused.confidence),
        visual_prob: round4(visual_prob),
        audio_prob: audio_prob.map(round4),
        frames_analyzed: visual.frames_analyzed,
        has_audio: audio.has_audio,
    };
    debug_assert!(result.invariants_hold());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfscan_models::DegradeReason;

    fn scored_visual(probability: f64, frames: u32) -> VisualScore {
        VisualScore {
            outcome: ModalityOutcome::scored(probability),
            frames_analyzed: frames,
        }
    }

    fn scored_audio(probability: f64) -> AudioScore {
        AudioScore {
            outcome: ModalityOutcome::scored(probability),
            has_audio: true,
        }
    }

    #[test]
    fn test_publish_both_modalities() {
        let result = publish("clip.mp4", scored_visual(0.8, 20), scored_audio(0.2));

        assert!(result.verdict);
        assert_eq!(result.fake_probability, 0.56);
        assert_eq!(result.confidence, 0.56);
        assert_eq!(result.visual_prob, 0.8);
        assert_eq!(result.audio_prob, Some(0.2));
        assert_eq!(result.frames_analyzed, 20);
        assert!(result.has_audio);
        assert!(result.invariants_hold());
    }

    #[test]
    fn test_publish_degraded_visual() {
        // No scorable frames: visual contributes 0.0, audio still counts.
        let visual = VisualScore {
            outcome: ModalityOutcome::degraded(DegradeReason::NoFrames),
            frames_analyzed: 0,
        };
        let result = publish("clip.mp4", visual, scored_audio(0.7));

        assert!(!result.verdict);
        assert_eq!(result.fake_probability, 0.28);
        assert_eq!(result.confidence, 0.72);
        assert_eq!(result.visual_prob, 0.0);
        assert_eq!(result.frames_analyzed, 0);
        assert!(result.invariants_hold());
    }

    #[test]
    fn test_publish_no_audio_track() {
        let audio = AudioScore {
            outcome: ModalityOutcome::degraded(DegradeReason::NoAudioTrack),
            has_audio: false,
        };
        let result = publish("silent.mp4", scored_visual(0.432156, 18), audio);

        // Visual-only: the fused probability is exactly the visual score.
        assert_eq!(result.fake_probability, result.visual_prob);
        assert_eq!(result.fake_probability, 0.4322);
        assert_eq!(result.audio_prob, None);
        assert!(!result.has_audio);
        assert!(result.invariants_hold());
    }

    #[test]
    fn test_publish_broken_audio_track_is_neutral() {
        let audio = AudioScore {
            outcome: ModalityOutcome::degraded(DegradeReason::TranscodeFailed),
            has_audio: true,
        };
        let result = publish("clip.mp4", scored_visual(0.9, 20), audio);

        assert_eq!(result.audio_prob, Some(0.5));
        assert!(result.has_audio);
        // 0.6 * 0.9 + 0.4 * 0.5
        assert_eq!(result.fake_probability, 0.74);
        assert!(result.invariants_hold());
    }

    #[test]
    fn test_publish_tie_resolves_to_real() {
        let result = publish("clip.mp4", scored_visual(0.5, 20), scored_audio(0.5));

        assert!(!result.verdict);
        assert_eq!(result.fake_probability, 0.5);
        assert_eq!(result.confidence, 0.5);
        assert!(result.invariants_hold());
    }

    #[test]
    fn test_publish_rounds_to_four_decimals() {
        let result = publish("clip.mp4", scored_visual(0.123456, 20), scored_audio(0.654321));

        // 0.6 * 0.123456 + 0.4 * 0.654321 = 0.3358020
        assert_eq!(result.fake_probability, 0.3358);
        assert_eq!(result.visual_prob, 0.1235);
        assert_eq!(result.audio_prob, Some(0.6543));
        assert!(result.invariants_hold());
    }

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.frames_per_video, 20);
        assert_eq!(config.visual_input_size, 224);
        assert_eq!(config.mfcc.n_mfcc, 40);
        assert_eq!(config.max_concurrent_inference, 2);
    }
}
