//! Late fusion of the visual and audio fake-likelihoods.

/// Weight of the visual channel when both modalities scored.
pub const VISUAL_WEIGHT: f64 = 0.6;

/// Weight of the audio channel when both modalities scored.
pub const AUDIO_WEIGHT: f64 = 0.4;

/// Fused verdict over both modalities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fusion {
    /// Weighted fake-likelihood, full precision
    pub fake_probability: f64,
    /// True if the video is classified as manipulated
    pub verdict: bool,
    /// Confidence in the verdict, in [0.5, 1.0]
    pub confidence: f64,
}

/// Combine the per-modality probabilities into a verdict.
///
/// With an audio score, the channels fuse at 0.6/0.4; without one, the
/// visual score stands alone. The verdict is fake only strictly above 0.5,
/// so an exact tie resolves to real. Confidence is the probability mass on
/// the winning side.
pub fn combine(visual: f64, audio: Option<f64>) -> Fusion {
    let fake_probability = match audio {
        Some(audio) => VISUAL_WEIGHT * visual + AUDIO_WEIGHT * audio,
        None => visual,
    };

    let verdict = fake_probability > 0.5;
    let confidence = if verdict {
        fake_probability
    } else {
        1.0 - fake_probability
    };

    Fusion {
        fake_probability,
        verdict,
        confidence,
    }
}
