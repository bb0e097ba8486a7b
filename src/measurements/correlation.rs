//! Pearson correlation between two measurement types

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::AnalyticsConfig;
use crate::measurements::entries_of_type;
use crate::types::Measurement;

/// Analyzer pairing two types on their shared calendar dates
#[derive(Debug, Clone)]
pub struct CorrelationAnalyzer {
    min_pairs: usize,
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalyticsConfig::default())
    }
}

impl CorrelationAnalyzer {
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self {
            min_pairs: config.min_correlation_pairs,
        }
    }

    /// Pearson coefficient over dates present in both types.
    ///
    /// When a type has several entries on one day the latest is used.
    /// Returns `None` with too few pairs or zero variance in either series.
    pub fn correlate(
        &self,
        measurements: &[Measurement],
        type_a: &str,
        type_b: &str,
    ) -> Option<f64> {
        let a = daily_values(measurements, type_a);
        let b = daily_values(measurements, type_b);

        let pairs: Vec<(f64, f64)> = a
            .iter()
            .filter_map(|(date, x)| b.get(date).map(|y| (*x, *y)))
            .collect();

        if pairs.len() < self.min_pairs.max(2) {
            return None;
        }

        pearson(&pairs)
    }
}

fn daily_values(measurements: &[Measurement], measurement_type: &str) -> BTreeMap<NaiveDate, f64> {
    entries_of_type(measurements, measurement_type)
        .into_iter()
        .map(|m| (m.date.date_naive(), m.value))
        .collect()
}

/// Sum-of-products Pearson formula
fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (x, y) in pairs {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
        sum_y2 += y * y;
    }

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    Some((numerator / denominator).clamp(-1.0, 1.0))
}

/// Correlation with the default three-pair minimum
pub fn correlate(measurements: &[Measurement], type_a: &str, type_b: &str) -> Option<f64> {
    CorrelationAnalyzer::default().correlate(measurements, type_a, type_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurements::test_support::make_measurement;
    use crate::measurements::{BODY_WEIGHT, WAIST};

    fn paired(weights: &[f64], waists: &[f64]) -> Vec<Measurement> {
        let mut measurements = Vec::new();
        for (i, w) in weights.iter().enumerate() {
            measurements.push(make_measurement(BODY_WEIGHT, *w, i as i64));
        }
        for (i, w) in waists.iter().enumerate() {
            measurements.push(make_measurement(WAIST, *w, i as i64));
        }
        measurements
    }

    #[test]
    fn test_default_follows_config_defaults() {
        let config = AnalyticsConfig::default();
        assert_eq!(CorrelationAnalyzer::default().min_pairs, config.min_correlation_pairs);
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let measurements = paired(&[80.0, 81.0, 82.0, 83.0], &[84.0, 86.0, 88.0, 90.0]);
        let r = correlate(&measurements, BODY_WEIGHT, WAIST).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_correlation_is_symmetric() {
        let measurements = paired(&[80.0, 79.0, 81.5, 78.0, 77.2], &[84.0, 86.0, 83.0, 88.0, 87.0]);
        let ab = correlate(&measurements, BODY_WEIGHT, WAIST).unwrap();
        let ba = correlate(&measurements, WAIST, BODY_WEIGHT).unwrap();

        assert_eq!(ab, ba);
        assert!(ab < 0.0);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_requires_three_shared_dates() {
        let mut measurements = paired(&[80.0, 81.0], &[84.0, 86.0]);
        // Dates only one type has do not count
        measurements.push(make_measurement(BODY_WEIGHT, 82.0, 10));
        measurements.push(make_measurement(WAIST, 88.0, 11));
        assert!(correlate(&measurements, BODY_WEIGHT, WAIST).is_none());
    }

    #[test]
    fn test_zero_variance() {
        let measurements = paired(&[80.0, 80.0, 80.0], &[84.0, 86.0, 88.0]);
        assert!(correlate(&measurements, BODY_WEIGHT, WAIST).is_none());
    }

    #[test]
    fn test_same_day_uses_latest_entry() {
        let mut measurements = paired(&[80.0, 81.0, 82.0], &[84.0, 86.0, 88.0]);
        // Earlier reading on the most recent day is superseded by the one above
        let mut early = make_measurement(BODY_WEIGHT, 100.0, 0);
        early.date = early.date - chrono::Duration::hours(2);
        measurements.push(early);

        let r = correlate(&measurements, BODY_WEIGHT, WAIST).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }
}
