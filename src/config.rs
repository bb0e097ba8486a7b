//! Engine configuration
//!
//! Tunable thresholds for every component. The defaults reproduce the
//! documented behavior; callers only override what they need.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::types::TrendPeriod;

/// Number of sets in each trend comparison window
pub const DEFAULT_TREND_WINDOW_SETS: usize = 6;

/// Default anomaly threshold in standard deviations
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;

/// How gaps between logged days are credited by the streak counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakRule {
    /// Same-day match adds 1, a one-day step adds 2
    #[default]
    Compat,
    /// Every consecutive logged day adds 1
    Linear,
}

/// Thresholds used across the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Sets per window when classifying exercise trends
    pub trend_window_sets: usize,
    /// Below this many sets an exercise trend is always stable
    pub min_trend_sets: usize,
    /// Relative volume change needed to leave `stable`
    pub trend_change_threshold: f64,
    /// Percent change needed for an up/down measurement trend
    pub measurement_trend_threshold_pct: f64,
    /// Anomaly cut-off in population standard deviations
    pub anomaly_threshold: f64,
    pub min_anomaly_entries: usize,
    pub min_correlation_pairs: usize,
    /// Period used for trend insights
    pub insight_trend_period: TrendPeriod,
    /// Percent change that produces a trend insight
    pub insight_trend_pct: f64,
    /// Percent change that makes a trend insight high priority
    pub insight_high_priority_pct: f64,
    /// Entry count that earns a milestone insight
    pub milestone_entries: usize,
    /// Unit label attached to weight and volume records
    pub weight_unit: String,
    pub streak_rule: StreakRule,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_window_sets: DEFAULT_TREND_WINDOW_SETS,
            min_trend_sets: 4,
            trend_change_threshold: 0.05,
            measurement_trend_threshold_pct: 2.0,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            min_anomaly_entries: 3,
            min_correlation_pairs: 3,
            insight_trend_period: TrendPeriod::Month,
            insight_trend_pct: 10.0,
            insight_high_priority_pct: 20.0,
            milestone_entries: 10,
            weight_unit: "kg".to_string(),
            streak_rule: StreakRule::Compat,
        }
    }
}

impl AnalyticsConfig {
    /// Reject settings that would make the computations meaningless
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.trend_window_sets == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "trend_window_sets must be at least 1".to_string(),
            ));
        }
        check_non_negative("trend_change_threshold", self.trend_change_threshold)?;
        check_non_negative(
            "measurement_trend_threshold_pct",
            self.measurement_trend_threshold_pct,
        )?;
        check_positive("anomaly_threshold", self.anomaly_threshold)?;
        check_non_negative("insight_trend_pct", self.insight_trend_pct)?;
        check_non_negative("insight_high_priority_pct", self.insight_high_priority_pct)?;
        if self.min_correlation_pairs < 2 {
            return Err(AnalyticsError::InvalidParameter(
                "min_correlation_pairs must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), AnalyticsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidParameter(format!(
            "{name} must be a finite, non-negative number (got {value})"
        )))
    }
}

/// Positive, finite check shared with call sites taking explicit thresholds
pub(crate) fn check_positive(name: &str, value: f64) -> Result<(), AnalyticsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidParameter(format!(
            "{name} must be a finite, positive number (got {value})"
        )))
    }
}
