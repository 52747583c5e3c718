//! Visual modality scoring: sampled frames through the image classifier.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use dfscan_models::{DegradeReason, ModalityOutcome};

use crate::detection::classifier::ImageClassifier;
use crate::error::MediaResult;
use crate::frames::FrameSampler;

/// Outcome of the visual pipeline for one video.
#[derive(Debug)]
pub struct VisualScore {
    pub outcome: ModalityOutcome,
    /// Frames that actually produced a score
    pub frames_analyzed: u32,
}

/// Scores a video's visual track by averaging per-frame classifier output.
pub struct VisualScorer {
    sampler: FrameSampler,
    classifier: Arc<dyn ImageClassifier>,
    frames_per_video: u32,
    inference_permits: Arc<Semaphore>,
}

impl VisualScorer {
    pub fn new(
        sampler: FrameSampler,
        classifier: Arc<dyn ImageClassifier>,
        frames_per_video: u32,
        inference_permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            sampler,
            classifier,
            frames_per_video,
            inference_permits,
        }
    }

    /// Score the visual track.
    ///
    /// Fatal source errors propagate; everything else degrades the modality
    /// so the overall analysis can still publish a record.
    pub async fn score(&self, video: &Path) -> MediaResult<VisualScore> {
        let frames = match self.sampler.extract_frames(video, self.frames_per_video).await {
            Ok(frames) => frames,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Frame extraction failed, degrading visual modality");
                return Ok(VisualScore {
                    outcome: ModalityOutcome::degraded(DegradeReason::NoFrames),
                    frames_analyzed: 0,
                });
            }
        };

        if frames.is_empty() {
            return Ok(VisualScore {
                outcome: ModalityOutcome::degraded(DegradeReason::NoFrames),
                frames_analyzed: 0,
            });
        }

        let mut scores: Vec<f32> = Vec::with_capacity(frames.len());
        for frame in frames {
            // Bound concurrent inference across all pipelines.
            let _permit = self
                .inference_permits
                .acquire()
                .await
                .map_err(|_| crate::error::MediaError::internal("Inference semaphore closed"))?;

            let classifier = Arc::clone(&self.classifier);
            let result =
                tokio::task::spawn_blocking(move || classifier.score_image(&frame)).await;

            match result {
                Ok(Ok(score)) => scores.push(score),
                Ok(Err(e)) => {
                    warn!(error = %e, "Frame scoring failed, skipping frame");
                }
                Err(e) => {
                    warn!(error = %e, "Frame scoring task panicked, skipping frame");
                }
            }
        }

        if scores.is_empty() {
            return Ok(VisualScore {
                outcome: ModalityOutcome::degraded(DegradeReason::NoScorableFrames),
                frames_analyzed: 0,
            });
        }

        let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64;
        debug!(
            frames = scores.len(),
            probability = mean,
            "Visual modality scored"
        );

        Ok(VisualScore {
            outcome: ModalityOutcome::scored(mean),
            frames_analyzed: scores.len() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MediaError, MediaResult};
    use image::DynamicImage;

    struct FixedClassifier(f32);

    impl ImageClassifier for FixedClassifier {
        fn score_image(&self, _image: &DynamicImage) -> MediaResult<f32> {
            Ok(self.0)
        }
    }

    struct FailingClassifier;

    impl ImageClassifier for FailingClassifier {
        fn score_image(&self, _image: &DynamicImage) -> MediaResult<f32> {
            Err(MediaError::inference("boom"))
        }
    }

    fn scorer(classifier: Arc<dyn ImageClassifier>) -> VisualScorer {
        VisualScorer::new(
            FrameSampler::new(),
            classifier,
            20,
            Arc::new(Semaphore::new(2)),
        )
    }

    #[tokio::test]
    async fn test_missing_source_is_fatal() {
        let scorer = scorer(Arc::new(FixedClassifier(0.8)));
        let err = scorer.score(Path::new("/nonexistent/clip.mp4")).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_failing_classifier_surfaces_error() {
        let classifier: Arc<dyn ImageClassifier> = Arc::new(FailingClassifier);
        let img = DynamicImage::new_rgb8(8, 8);
        assert!(classifier.score_image(&img).is_err());
    }

    #[tokio::test]
    async fn test_fixed_classifier_scores() {
        let classifier: Arc<dyn ImageClassifier> = Arc::new(FixedClassifier(0.75));
        let img = DynamicImage::new_rgb8(8, 8);
        let score = classifier.score_image(&img).unwrap();
        assert!((score - 0.75).abs() < 1e-6);
    }
}
