//! Equally-spaced frame sampling.
//!
//! Frames are decoded with the FFmpeg `select` filter into a temp directory
//! owned by the current analysis, so concurrent requests never share or
//! overwrite each other's frame artifacts.

use std::path::Path;

use image::DynamicImage;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe;

/// Samples an ordered, equally-spaced set of frames from a video.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    /// Per-invocation FFmpeg timeout in seconds.
    timeout_secs: u64,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSampler {
    pub fn new() -> Self {
        Self { timeout_secs: 120 }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Extract up to `target_count` equally-spaced frames, in temporal order.
    ///
    /// Fails with `SourceNotFound` if the path does not exist and
    /// `SourceUnreadable` if the container cannot be opened. A video from
    /// which zero frames decode returns an empty list, not an error.
    pub async fn extract_frames(
        &self,
        video: impl AsRef<Path>,
        target_count: u32,
    ) -> MediaResult<Vec<DynamicImage>> {
        let video = video.as_ref();

        if !video.exists() {
            return Err(MediaError::SourceNotFound(video.to_path_buf()));
        }

        let info = probe::probe_video(video).await?;

        // Prefer the container-reported count; fall back to a full decode
        // when it is unknown or zero.
        let total = match info.frame_count {
            Some(n) => n,
            None => {
                debug!(path = %video.display(), "Container does not report frame count, counting by full decode");
                probe::count_frames(video).await?
            }
        };

        if total == 0 || target_count == 0 {
            return Ok(Vec::new());
        }

        let indices = sample_indices(total, target_count);
        debug!(
            path = %video.display(),
            total_frames = total,
            requested = target_count,
            selected = indices.len(),
            "Sampling frames"
        );

        // Request-scoped artifact directory: dropped (and deleted) when
        // extraction finishes.
        let scratch = TempDir::new()?;
        let pattern = scratch.path().join("frame_%05d.png");

        let filter = select_filter(&indices);
        let cmd = FfmpegCommand::new(video, &pattern)
            .video_filter(filter)
            .output_args(["-vsync", "0"]);

        FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run(&cmd)
            .await
            .map_err(|e| match e {
                // The source was probed successfully, so a decode failure
                // here means the container is unreadable after all.
                MediaError::FfmpegFailed { stderr, .. } => MediaError::unreadable(format!(
                    "frame decode failed: {}",
                    stderr.unwrap_or_default().trim()
                )),
                other => other,
            })?;

        // Output ordinals follow decode order, so sorting by filename
        // preserves temporal order.
        let mut paths: Vec<_> = std::fs::read_dir(scratch.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            match image::open(&path) {
                Ok(img) => frames.push(img),
                Err(e) => {
                    warn!(frame = %path.display(), error = %e, "Skipping undecodable frame");
                }
            }
        }

        Ok(frames)
    }
}

/// Compute `target` equally-spaced integer indices across `[0, total - 1]`
/// by linear interpolation. Duplicate indices (when `total < target`)
/// collapse, so fewer than `target` indices may be returned.
pub fn sample_indices(total: u64, target: u32) -> Vec<u64> {
    if total == 0 || target == 0 {
        return Vec::new();
    }
    if target == 1 {
        return vec![0];
    }

    let last = (total - 1) as f64;
    let step = last / (target - 1) as f64;

    let mut indices = Vec::with_capacity(target as usize);
    for i in 0..target {
        let idx = (i as f64 * step) as u64;
        if indices.last() != Some(&idx) {
            indices.push(idx);
        }
    }
    indices
}

/// Build the FFmpeg `select` filter expression for a set of frame indices.
fn select_filter(indices: &[u64]) -> String {
    let terms: Vec<String> = indices.iter().map(|i| format!("eq(n\\,{i})")).collect();
    format!("select={}", terms.join("+"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_indices_spacing() {
        let indices = sample_indices(100, 5);
        assert_eq!(indices, vec![0, 24, 49, 74, 99]);
    }

    #[test]
    fn test_sample_indices_deterministic() {
        assert_eq!(sample_indices(91, 20), sample_indices(91, 20));
    }

    #[test]
    fn test_sample_indices_bounds() {
        let indices = sample_indices(91, 20);
        assert!(indices.len() <= 20);
        assert_eq!(*indices.first().unwrap(), 0);
        assert_eq!(*indices.last().unwrap(), 90);
        // Strictly increasing.
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_indices_duplicates_collapse() {
        // Fewer frames than requested: every frame selected exactly once.
        let indices = sample_indices(5, 20);
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_indices_edge_cases() {
        assert!(sample_indices(0, 20).is_empty());
        assert!(sample_indices(100, 0).is_empty());
        assert_eq!(sample_indices(100, 1), vec![0]);
        assert_eq!(sample_indices(1, 20), vec![0]);
    }

    #[test]
    fn test_select_filter() {
        let filter = select_filter(&[0, 10, 20]);
        assert_eq!(filter, "select=eq(n\\,0)+eq(n\\,10)+eq(n\\,20)");
    }

    #[tokio::test]
    async fn test_extract_frames_missing_file() {
        let sampler = FrameSampler::new();
        let err = sampler
            .extract_frames("/nonexistent/clip.mp4", 20)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::SourceNotFound(_)));
    }
}
