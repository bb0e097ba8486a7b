//! Statistical anomaly detection for measurements

use std::collections::BTreeMap;

use crate::config::{check_positive, AnalyticsConfig};
use crate::error::AnalyticsError;
use crate::measurements::{entries_of_type, group_by_type};
use crate::types::Measurement;

/// Flags entries further than `threshold` population standard deviations
/// from the mean of their type
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    threshold: f64,
    min_entries: usize,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        let config = AnalyticsConfig::default();
        Self {
            threshold: config.anomaly_threshold,
            min_entries: config.min_anomaly_entries,
        }
    }
}

impl AnomalyDetector {
    /// Create a detector; the threshold must be positive and finite
    pub fn new(threshold: f64) -> Result<Self, AnalyticsError> {
        check_positive("anomaly threshold", threshold)?;
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }

    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, AnalyticsError> {
        check_positive("anomaly threshold", config.anomaly_threshold)?;
        Ok(Self {
            threshold: config.anomaly_threshold,
            min_entries: config.min_anomaly_entries,
        })
    }

    /// Flagged entries of one type, in chronological order
    pub fn detect(&self, measurements: &[Measurement], measurement_type: &str) -> Vec<Measurement> {
        self.flag(&entries_of_type(measurements, measurement_type))
    }

    /// Flagged entries for every type that has any
    pub fn detect_all(&self, measurements: &[Measurement]) -> BTreeMap<String, Vec<Measurement>> {
        group_by_type(measurements)
            .into_iter()
            .filter_map(|(measurement_type, entries)| {
                let flagged = self.flag(&entries);
                (!flagged.is_empty()).then_some((measurement_type, flagged))
            })
            .collect()
    }

    fn flag(&self, entries: &[&Measurement]) -> Vec<Measurement> {
        if entries.len() < self.min_entries.max(1) {
            return Vec::new();
        }

        let n = entries.len() as f64;
        let mean = entries.iter().map(|m| m.value).sum::<f64>() / n;
        let variance = entries.iter().map(|m| (m.value - mean).powi(2)).sum::<f64>() / n;
        let limit = self.threshold * variance.sqrt();

        entries
            .iter()
            .filter(|m| (m.value - mean).abs() > limit)
            .map(|m| (*m).clone())
            .collect()
    }
}

/// Anomalies of one type with an explicit threshold
pub fn detect_anomalies(
    measurements: &[Measurement],
    measurement_type: &str,
    threshold: f64,
) -> Result<Vec<Measurement>, AnalyticsError> {
    Ok(AnomalyDetector::new(threshold)?.detect(measurements, measurement_type))
}
