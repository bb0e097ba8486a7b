//! Progress Engine - deterministic workout and body-measurement analytics
//!
//! The engine turns a snapshot of completed workouts and dated body
//! measurements into derived, read-only results: personal records,
//! per-exercise progress, measurement trends and statistics, health metrics,
//! anomalies, correlations and prioritized insights. Every computation is a
//! pure function of its inputs and an explicit reference time.
//!
//! ## Modules
//!
//! - **Workout pipeline**: set normalization → record detection → progress
//!   aggregation → workout insights
//! - **Measurement analytics**: trends, statistics, BMI and body fat,
//!   anomalies, correlations and measurement insights
//! - **Host interfaces**: JSON helpers, C ABI and the `progress` CLI

pub mod config;
pub mod error;
pub mod insights;
#[cfg(feature = "cli")]
pub mod logging;
pub mod measurements;
pub mod normalizer;
pub mod pipeline;
pub mod progress;
pub mod records;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{AnalyticsConfig, StreakRule};
pub use error::AnalyticsError;
pub use insights::InsightGenerator;
pub use measurements::{
    bmi, calculate_trend, correlate, detect_anomalies, navy_body_fat, StatisticsCalculator,
};
pub use normalizer::SetNormalizer;
pub use pipeline::{measurements_to_report_json, workouts_to_report_json, ProgressEngine};
pub use progress::ProgressAggregator;
pub use records::RecordDetector;

/// Engine version embedded in FFI and CLI output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by host interfaces
pub const PRODUCER_NAME: &str = "progress-engine";
