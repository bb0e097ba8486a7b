//! Error types for the progress engine
//!
//! Only caller mistakes surface as errors. Missing or malformed data produces
//! empty results instead.

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported gender: {0} (expected \"male\" or \"female\")")]
    UnsupportedGender(String),

    #[error("Unsupported period: {0} (expected week, month, quarter or year)")]
    UnsupportedPeriod(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
