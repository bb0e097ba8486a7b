//! Measurement trend calculation
//!
//! Compares the first and last value of a type inside a look-back window.

use chrono::{DateTime, Duration, Utc};

use crate::config::AnalyticsConfig;
use crate::measurements::entries_of_type;
use crate::types::{Measurement, MeasurementTrend, TrendDirection, TrendPeriod};

/// Minimum entries inside the window for a trend
const MIN_DATA_POINTS: usize = 2;

/// Calculator for period-over-period measurement change
#[derive(Debug, Clone)]
pub struct TrendCalculator {
    threshold_pct: f64,
}

impl Default for TrendCalculator {
    fn default() -> Self {
        Self::from_config(&AnalyticsConfig::default())
    }
}

impl TrendCalculator {
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self {
            threshold_pct: config.measurement_trend_threshold_pct,
        }
    }

    /// Trend for `measurement_type` over `period` ending at `now`.
    ///
    /// Returns `None` when fewer than two entries fall inside the window.
    pub fn calculate(
        &self,
        measurements: &[Measurement],
        measurement_type: &str,
        period: TrendPeriod,
        now: DateTime<Utc>,
    ) -> Option<MeasurementTrend> {
        let cutoff = now - Duration::days(period.days());
        let window: Vec<&Measurement> = entries_of_type(measurements, measurement_type)
            .into_iter()
            .filter(|m| m.date >= cutoff && m.date <= now)
            .collect();

        if window.len() < MIN_DATA_POINTS {
            return None;
        }

        let previous = window.first()?.value;
        let current = window.last()?.value;
        let change = current - previous;
        let change_percent = if previous != 0.0 {
            (change / previous) * 100.0
        } else {
            0.0
        };

        let trend = if change_percent.abs() > self.threshold_pct {
            if change_percent > 0.0 {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            }
        } else {
            TrendDirection::Stable
        };

        Some(MeasurementTrend {
            measurement_type: measurement_type.to_string(),
            period,
            trend,
            current,
            previous,
            change,
            change_percent,
            data_points: window.len(),
        })
    }
}

/// Trend with the default 2% threshold
pub fn calculate_trend(
    measurements: &[Measurement],
    measurement_type: &str,
    period: TrendPeriod,
    now: DateTime<Utc>,
) -> Option<MeasurementTrend> {
    TrendCalculator::default().calculate(measurements, measurement_type, period, now)
}
