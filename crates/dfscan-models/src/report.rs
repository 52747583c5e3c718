//! Wire-format report returned by the API.
//!
//! The ingress layer wraps the core's `AnalysisResult` in the shape the
//! frontend consumes: verdict fields at the top level, per-modality values
//! under `details`, plus the end-to-end processing time.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// Per-modality detail block of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDetails {
    pub visual_prob: f64,
    /// `null` when the video has no audio track.
    pub audio_prob: Option<f64>,
    pub frames_analyzed: u32,
    pub has_audio: bool,
}

/// Analysis report rendered to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub filename: String,
    pub is_fake: bool,
    pub confidence: f64,
    pub fake_probability: f64,
    pub details: ReportDetails,
    /// End-to-end processing time in seconds.
    pub processing_time: f64,
}

impl AnalysisReport {
    /// Build a report from a core result and the measured wall time.
    pub fn from_result(result: &AnalysisResult, processing_time: f64) -> Self {
        Self {
            filename: result.filename.clone(),
            is_fake: result.verdict,
            confidence: result.confidence,
            fake_probability: result.fake_probability,
            details: ReportDetails {
                visual_prob: result.visual_prob,
                audio_prob: result.audio_prob,
                frames_analyzed: result.frames_analyzed,
                has_audio: result.has_audio,
            },
            processing_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            filename: "clip.mp4".to_string(),
            verdict: true,
            fake_probability: 0.56,
            confidence: 0.56,
            visual_prob: 0.8,
            audio_prob: Some(0.2),
            frames_analyzed: 20,
            has_audio: true,
        }
    }

    #[test]
    fn test_report_from_result() {
        let report = AnalysisReport::from_result(&sample_result(), 3.21);
        assert!(report.is_fake);
        assert_eq!(report.fake_probability, 0.56);
        assert_eq!(report.details.audio_prob, Some(0.2));
        assert_eq!(report.details.frames_analyzed, 20);
        assert!((report.processing_time - 3.21).abs() < 1e-9);
    }

    #[test]
    fn test_report_serializes_null_audio_prob() {
        let mut result = sample_result();
        result.audio_prob = None;
        result.has_audio = false;
        result.verdict = false;
        result.fake_probability = 0.2;
        result.confidence = 0.8;

        let report = AnalysisReport::from_result(&result, 1.0);
        let json = serde_json::to_value(&report).unwrap();

        // audio_prob must be an explicit null in the wire format, not omitted.
        assert!(json["details"]["audio_prob"].is_null());
        assert_eq!(json["is_fake"], false);
    }

    #[test]
    fn test_report_round_trip() {
        let report = AnalysisReport::from_result(&sample_result(), 2.5);
        let json = serde_json::to_string(&report).unwrap();
        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.filename, "clip.mp4");
        assert_eq!(back.details.visual_prob, 0.8);
    }
}
