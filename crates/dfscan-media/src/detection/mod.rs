//! Deepfake detection: classifiers, per-modality scoring, and fusion.

pub mod audio;
pub mod classifier;
pub mod detector;
pub mod fusion;
pub mod visual;

pub use audio::{AudioScore, AudioScorer};
pub use visual::{VisualScore, VisualScorer};
