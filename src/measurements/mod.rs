//! Body measurement analytics
//!
//! This module turns a flat list of dated measurements into trends, corpus
//! statistics, health metrics, anomalies and correlations.
//!
//! Measurements are grouped by their `type` string. Entries with non-finite
//! values are skipped before any computation.

pub mod anomaly;
pub mod correlation;
pub mod health;
pub mod stats;
pub mod trend;

pub use anomaly::{detect_anomalies, AnomalyDetector};
pub use correlation::{correlate, CorrelationAnalyzer};
pub use health::{bmi, bmi_category, navy_body_fat, navy_body_fat_from};
pub use stats::{summarize, StatisticsCalculator};
pub use trend::{calculate_trend, TrendCalculator};

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::Measurement;

/// Well-known measurement type names
pub const BODY_WEIGHT: &str = "body_weight";
pub const HEIGHT: &str = "height";
pub const WAIST: &str = "waist";
pub const NECK: &str = "neck";
pub const HIPS: &str = "hips";
pub const BODY_FAT: &str = "body_fat";

/// Entries with a finite value, in input order
pub fn valid_entries(measurements: &[Measurement]) -> impl Iterator<Item = &Measurement> {
    measurements.iter().filter(|m| {
        let ok = m.value.is_finite();
        if !ok {
            debug!(
                measurement_type = %m.measurement_type,
                date = %m.date,
                "skipping non-finite measurement"
            );
        }
        ok
    })
}

/// Valid entries of one type, sorted ascending by date (stable)
pub fn entries_of_type<'a>(
    measurements: &'a [Measurement],
    measurement_type: &str,
) -> Vec<&'a Measurement> {
    let mut entries: Vec<&Measurement> = valid_entries(measurements)
        .filter(|m| m.measurement_type == measurement_type)
        .collect();
    entries.sort_by_key(|m| m.date);
    entries
}

/// Valid entries grouped by type, each group sorted ascending by date
pub fn group_by_type(measurements: &[Measurement]) -> BTreeMap<String, Vec<&Measurement>> {
    let mut groups: BTreeMap<String, Vec<&Measurement>> = BTreeMap::new();
    for m in valid_entries(measurements) {
        groups.entry(m.measurement_type.clone()).or_default().push(m);
    }
    for entries in groups.values_mut() {
        entries.sort_by_key(|m| m.date);
    }
    groups
}

/// Convert a body weight to kilograms. An empty unit is taken as kilograms.
pub fn to_kilograms(value: f64, unit: &str) -> Option<f64> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "" | "kg" | "kgs" | "kilograms" => Some(value),
        "lb" | "lbs" | "pounds" => Some(value * 0.453_592_37),
        _ => None,
    }
}

/// Convert a length to centimeters. An empty unit is taken as centimeters.
pub fn to_centimeters(value: f64, unit: &str) -> Option<f64> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "" | "cm" | "centimeters" => Some(value),
        "m" | "meters" => Some(value * 100.0),
        "mm" => Some(value / 10.0),
        "in" | "inch" | "inches" => Some(value * 2.54),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_entries_of_type_sorted_and_filtered() {
        let measurements = vec![
            make_measurement(BODY_WEIGHT, 80.0, 1),
            make_measurement(BODY_WEIGHT, f64::NAN, 2),
            make_measurement(WAIST, 85.0, 3),
            make_measurement(BODY_WEIGHT, 81.0, 5),
        ];
        let entries = entries_of_type(&measurements, BODY_WEIGHT);
        let values: Vec<f64> = entries.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![81.0, 80.0]);
    }

    #[test]
    fn test_group_by_type() {
        let measurements = vec![
            make_measurement(WAIST, 85.0, 1),
            make_measurement(BODY_WEIGHT, 80.0, 1),
            make_measurement(WAIST, 86.0, 3),
            make_measurement(NECK, f64::INFINITY, 3),
        ];
        let groups = group_by_type(&measurements);
        let keys: Vec<&str> = groups.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec![BODY_WEIGHT, WAIST]);
        assert_eq!(groups[WAIST][0].value, 86.0);
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(to_kilograms(80.0, "kg"), Some(80.0));
        assert!((to_kilograms(176.0, "lbs").unwrap() - 79.832).abs() < 0.01);
        assert_eq!(to_kilograms(80.0, "stone"), None);
        assert_eq!(to_centimeters(1.8, "m"), Some(180.0));
        assert!((to_centimeters(34.0, "in").unwrap() - 86.36).abs() < 1e-9);
        assert_eq!(to_centimeters(180.0, ""), Some(180.0));
    }
}
