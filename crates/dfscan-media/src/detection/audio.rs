//! Audio modality scoring: waveform to MFCC to the spectrogram classifier.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use dfscan_models::{DegradeReason, ModalityOutcome};

use crate::audio::{AudioExtractor, AudioSource};
use crate::detection::classifier::SpectrogramClassifier;
use crate::error::{MediaError, MediaResult};
use crate::mfcc::MfccExtractor;

/// Outcome of the audio pipeline for one video.
#[derive(Debug)]
pub struct AudioScore {
    pub outcome: ModalityOutcome,
    /// Whether the container has an audio track at all
    pub has_audio: bool,
}

/// Scores a video's audio track through MFCC features.
pub struct AudioScorer {
    extractor: AudioExtractor,
    mfcc: Arc<MfccExtractor>,
    classifier: Arc<dyn SpectrogramClassifier>,
    inference_permits: Arc<Semaphore>,
}

impl AudioScorer {
    pub fn new(
        extractor: AudioExtractor,
        mfcc: Arc<MfccExtractor>,
        classifier: Arc<dyn SpectrogramClassifier>,
        inference_permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            extractor,
            mfcc,
            classifier,
            inference_permits,
        }
    }

    /// Score the audio track.
    ///
    /// A missing track, a broken track, and a failed inference all degrade;
    /// only fatal source errors propagate.
    pub async fn score(&self, video: &Path) -> MediaResult<AudioScore> {
        let source = match self.extractor.extract(video).await {
            Ok(source) => source,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Audio extraction failed, degrading audio modality");
                return Ok(AudioScore {
                    outcome: ModalityOutcome::degraded(DegradeReason::TranscodeFailed),
                    has_audio: true,
                });
            }
        };

        let waveform = match source {
            AudioSource::Waveform(wf) => wf,
            AudioSource::NoAudioTrack => {
                return Ok(AudioScore {
                    outcome: ModalityOutcome::degraded(DegradeReason::NoAudioTrack),
                    has_audio: false,
                });
            }
            AudioSource::Failed { reason } => {
                warn!(reason = %reason, "Audio track unprocessable, degrading audio modality");
                return Ok(AudioScore {
                    outcome: ModalityOutcome::degraded(DegradeReason::TranscodeFailed),
                    has_audio: true,
                });
            }
        };

        let _permit = self
            .inference_permits
            .acquire()
            .await
            .map_err(|_| MediaError::internal("Inference semaphore closed"))?;

        // MFCC computation and inference are both CPU-bound.
        let mfcc = Arc::clone(&self.mfcc);
        let classifier = Arc::clone(&self.classifier);
        let result = tokio::task::spawn_blocking(move || {
            let features = mfcc.compute(&waveform);
            classifier.score_spectrogram(&features)
        })
        .await;

        match result {
            Ok(Ok(score)) => {
                debug!(probability = score, "Audio modality scored");
                Ok(AudioScore {
                    outcome: ModalityOutcome::scored(score as f64),
                    has_audio: true,
                })
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Audio inference failed, degrading audio modality");
                Ok(AudioScore {
                    outcome: ModalityOutcome::degraded(DegradeReason::InferenceFailed),
                    has_audio: true,
                })
            }
            Err(e) => {
                warn!(error = %e, "Audio scoring task panicked, degrading audio modality");
                Ok(AudioScore {
                    outcome: ModalityOutcome::degraded(DegradeReason::FeatureExtractionFailed),
                    has_audio: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfcc::MfccConfig;
    use ndarray::Array2;

    struct FixedClassifier(f32);

    impl SpectrogramClassifier for FixedClassifier {
        fn score_spectrogram(&self, _features: &Array2<f32>) -> MediaResult<f32> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_missing_source_is_fatal() {
        let scorer = AudioScorer::new(
            AudioExtractor::new(),
            Arc::new(MfccExtractor::new(MfccConfig::default())),
            Arc::new(FixedClassifier(0.3)),
            Arc::new(Semaphore::new(2)),
        );
        let err = scorer.score(Path::new("/nonexistent/clip.mp4")).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_classifier_seam() {
        let classifier = FixedClassifier(0.42);
        let features = Array2::<f32>::zeros((40, 157));
        let score = classifier.score_spectrogram(&features).unwrap();
        assert!((score - 0.42).abs() < 1e-6);
    }
}
