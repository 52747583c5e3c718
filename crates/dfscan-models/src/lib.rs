//! Shared data models for the DFScan backend.
//!
//! This crate provides Serde-serializable types for:
//! - Per-modality scoring outcomes
//! - The fused analysis result record
//! - The wire-format report returned by the API

pub mod analysis;
pub mod report;

// Re-export common types
pub use analysis::{AnalysisResult, DegradeReason, ModalityOutcome};
pub use report::{AnalysisReport, ReportDetails};

/// Round a probability to 4 decimal digits for publishing.
///
/// Internal fusion arithmetic uses full precision; only published
/// record fields are rounded.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
