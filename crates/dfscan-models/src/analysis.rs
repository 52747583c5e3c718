//! Analysis result data models.
//!
//! The detector scores two independent evidence channels (visual frames and
//! the audio track) and fuses them into one record. Each channel produces a
//! `ModalityOutcome` so that a degraded channel is an explicit, inspectable
//! value rather than a swallowed error.

use serde::{Deserialize, Serialize};

/// Why a modality could not produce a genuine score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    /// No frames could be decoded from the video stream.
    NoFrames,
    /// Frames were decoded but none could be scored.
    NoScorableFrames,
    /// The container has no audio track.
    NoAudioTrack,
    /// An audio track exists but transcoding it failed.
    TranscodeFailed,
    /// The waveform could not be converted to features.
    FeatureExtractionFailed,
    /// Classifier inference failed.
    InferenceFailed,
}

impl DegradeReason {
    /// Returns the reason as a string for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFrames => "no_frames",
            Self::NoScorableFrames => "no_scorable_frames",
            Self::NoAudioTrack => "no_audio_track",
            Self::TranscodeFailed => "transcode_failed",
            Self::FeatureExtractionFailed => "feature_extraction_failed",
            Self::InferenceFailed => "inference_failed",
        }
    }
}

/// Outcome of scoring one modality.
///
/// `Scored` carries a fake-likelihood in [0, 1]. `Degraded` records why no
/// genuine score exists; the fusion layer decides what a degraded channel
/// contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModalityOutcome {
    Scored { probability: f64 },
    Degraded { reason: DegradeReason },
}

impl ModalityOutcome {
    /// Create a scored outcome, clamping to [0, 1].
    pub fn scored(probability: f64) -> Self {
        Self::Scored {
            probability: probability.clamp(0.0, 1.0),
        }
    }

    /// Create a degraded outcome.
    pub fn degraded(reason: DegradeReason) -> Self {
        Self::Degraded { reason }
    }

    /// The genuine score, if one exists.
    pub fn probability(&self) -> Option<f64> {
        match self {
            Self::Scored { probability } => Some(*probability),
            Self::Degraded { .. } => None,
        }
    }

    /// True if this modality produced a genuine score.
    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored { .. })
    }
}

/// The fused result of analyzing one video.
///
/// Invariants:
/// - all probabilities are in [0, 1]
/// - `confidence` equals `fake_probability` when `verdict` is true and
///   `1 - fake_probability` otherwise, so it is always in [0.5, 1.0]
/// - `audio_prob` is `None` iff `has_audio` is false
/// - `frames_analyzed` never exceeds the requested frame count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Base name of the analyzed file.
    pub filename: String,

    /// True if the video is classified as manipulated.
    pub verdict: bool,

    /// Fused fake-likelihood, rounded to 4 decimals.
    pub fake_probability: f64,

    /// Confidence in the verdict, in [0.5, 1.0].
    pub confidence: f64,

    /// Mean fake-likelihood over scored frames, rounded to 4 decimals.
    pub visual_prob: f64,

    /// Audio fake-likelihood; absent when the video has no audio track.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_prob: Option<f64>,

    /// Number of frames that produced a score; frames that fail to decode
    /// or classify are excluded.
    pub frames_analyzed: u32,

    /// True when the container has an audio track.
    pub has_audio: bool,
}

impl AnalysisResult {
    /// Check the record's internal invariants. Used by tests and debug
    /// assertions; a violation indicates a bug in fusion or assembly.
    pub fn invariants_hold(&self) -> bool {
        let probs_ok = (0.0..=1.0).contains(&self.fake_probability)
            && (0.0..=1.0).contains(&self.visual_prob)
            && self.audio_prob.is_none_or(|p| (0.0..=1.0).contains(&p));

        let expected_confidence = if self.verdict {
            self.fake_probability
        } else {
            1.0 - self.fake_probability
        };
        let confidence_ok = (self.confidence - expected_confidence).abs() < 1e-9
            && (0.5..=1.0).contains(&self.confidence);

        let audio_ok = self.audio_prob.is_none() == !self.has_audio;

        probs_ok && confidence_ok && audio_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_outcome_clamps() {
        assert_eq!(ModalityOutcome::scored(1.5).probability(), Some(1.0));
        assert_eq!(ModalityOutcome::scored(-0.1).probability(), Some(0.0));
        assert_eq!(ModalityOutcome::scored(0.7).probability(), Some(0.7));
    }

    #[test]
    fn test_degraded_outcome_has_no_probability() {
        let outcome = ModalityOutcome::degraded(DegradeReason::NoAudioTrack);
        assert!(!outcome.is_scored());
        assert_eq!(outcome.probability(), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let scored = ModalityOutcome::scored(0.8);
        let json = serde_json::to_value(scored).unwrap();
        assert_eq!(json["outcome"], "scored");
        assert_eq!(json["probability"], 0.8);

        let degraded = ModalityOutcome::degraded(DegradeReason::TranscodeFailed);
        let json = serde_json::to_value(degraded).unwrap();
        assert_eq!(json["outcome"], "degraded");
        assert_eq!(json["reason"], "transcode_failed");
    }

    #[test]
    fn test_result_invariants() {
        let result = AnalysisResult {
            filename: "clip.mp4".to_string(),
            verdict: true,
            fake_probability: 0.56,
            confidence: 0.56,
            visual_prob: 0.8,
            audio_prob: Some(0.2),
            frames_analyzed: 20,
            has_audio: true,
        };
        assert!(result.invariants_hold());
    }

    #[test]
    fn test_result_invariants_reject_orphan_audio_prob() {
        let result = AnalysisResult {
            filename: "clip.mp4".to_string(),
            verdict: false,
            fake_probability: 0.3,
            confidence: 0.7,
            visual_prob: 0.3,
            audio_prob: Some(0.4),
            frames_analyzed: 10,
            has_audio: false,
        };
        assert!(!result.invariants_hold());
    }

    #[test]
    fn test_result_invariants_reject_wrong_confidence() {
        let result = AnalysisResult {
            filename: "clip.mp4".to_string(),
            verdict: true,
            fake_probability: 0.9,
            confidence: 0.1,
            visual_prob: 0.9,
            audio_prob: None,
            frames_analyzed: 10,
            has_audio: false,
        };
        assert!(!result.invariants_hold());
    }

    #[test]
    fn test_audio_prob_skipped_when_absent() {
        let result = AnalysisResult {
            filename: "silent.mp4".to_string(),
            verdict: false,
            fake_probability: 0.2,
            confidence: 0.8,
            visual_prob: 0.2,
            audio_prob: None,
            frames_analyzed: 18,
            has_audio: false,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("audio_prob"));
    }
}
