//! Axum HTTP API for deepfake video analysis.
//!
//! This crate provides:
//! - `POST /api/analyze` multipart upload endpoint
//! - Health and readiness probes
//! - Prometheus metrics
//! - Request logging with per-request IDs

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
