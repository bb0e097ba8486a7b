//! Personal record detection
//!
//! Each exercise group is scanned once per metric. A record is emitted only
//! when a value strictly exceeds the running maximum for its key, so equal
//! values never produce a record and the first of several tied sets wins.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::trace;
use uuid::Uuid;

use crate::types::{PerformanceSet, PersonalRecord, RecordType};

/// Namespace for deterministic record identifiers
const RECORD_NAMESPACE: Uuid = Uuid::from_u128(0x5c1e_7a2b_90d4_4f3e_8b61_2d0a_c4e9_71f5);

/// Unit label for duration records
const DURATION_UNIT: &str = "seconds";

/// Record detector for one exercise's chronologically ordered sets
pub struct RecordDetector {
    weight_unit: String,
}

impl Default for RecordDetector {
    fn default() -> Self {
        Self::new("kg")
    }
}

impl RecordDetector {
    /// Create a detector labelling weight and volume records with `weight_unit`
    pub fn new(weight_unit: impl Into<String>) -> Self {
        Self {
            weight_unit: weight_unit.into(),
        }
    }

    /// Detect all records for one exercise.
    ///
    /// `sets` must already be sorted by `completed_at`. Output is ordered by
    /// `achieved_at`, then by metric.
    pub fn detect(&self, sets: &[PerformanceSet]) -> Vec<PersonalRecord> {
        let mut records = Vec::new();
        records.extend(self.weight_records(sets));
        records.extend(self.reps_records(sets));
        records.extend(self.volume_records(sets));
        records.extend(self.duration_records(sets));

        records.sort_by(|a, b| {
            a.achieved_at
                .cmp(&b.achieved_at)
                .then(a.record_type.cmp(&b.record_type))
        });
        records
    }

    /// Detect records for every exercise group
    pub fn detect_all(
        &self,
        groups: &BTreeMap<String, Vec<PerformanceSet>>,
    ) -> BTreeMap<String, Vec<PersonalRecord>> {
        groups
            .iter()
            .map(|(exercise_id, sets)| (exercise_id.clone(), self.detect(sets)))
            .collect()
    }

    fn weight_records(&self, sets: &[PerformanceSet]) -> Vec<PersonalRecord> {
        let mut scan = RunningMax::default();
        sets.iter()
            .filter(|s| s.is_strength())
            .filter_map(|set| {
                scan.offer(set.weight).map(|previous| {
                    build_record(
                        set,
                        RecordType::Weight,
                        set.weight,
                        &self.weight_unit,
                        previous,
                        None,
                    )
                })
            })
            .collect()
    }

    fn reps_records(&self, sets: &[PerformanceSet]) -> Vec<PersonalRecord> {
        // Keyed on the exact bit pattern of the weight
        let mut scans: BTreeMap<u64, RunningMax> = BTreeMap::new();
        let mut records = Vec::new();

        for set in sets.iter().filter(|s| s.is_strength()) {
            let scan = scans.entry(set.weight.to_bits()).or_default();
            if let Some(previous) = scan.offer(set.reps as f64) {
                let unit = format!("reps at {}{}", set.weight, self.weight_unit);
                records.push(build_record(
                    set,
                    RecordType::Reps,
                    set.reps as f64,
                    &unit,
                    previous,
                    Some(set.weight),
                ));
            }
        }
        records
    }

    fn volume_records(&self, sets: &[PerformanceSet]) -> Vec<PersonalRecord> {
        let mut scan = RunningMax::default();
        sets.iter()
            .filter(|s| s.is_strength())
            .filter_map(|set| {
                let volume = set.volume();
                scan.offer(volume).map(|previous| {
                    build_record(set, RecordType::Volume, volume, &self.weight_unit, previous, None)
                })
            })
            .collect()
    }

    fn duration_records(&self, sets: &[PerformanceSet]) -> Vec<PersonalRecord> {
        let mut scan = RunningMax::default();
        sets.iter()
            .filter_map(|set| {
                let duration = set.positive_duration()?;
                scan.offer(duration).map(|previous| {
                    build_record(set, RecordType::Duration, duration, DURATION_UNIT, previous, None)
                })
            })
            .collect()
    }
}

/// Strict running maximum for a single record key
#[derive(Debug, Default)]
struct RunningMax {
    best: Option<f64>,
}

impl RunningMax {
    /// Returns `Some(previous)` when `value` sets a new maximum
    fn offer(&mut self, value: f64) -> Option<Option<f64>> {
        let previous = self.best;
        if matches!(previous, Some(best) if value <= best) {
            return None;
        }
        self.best = Some(value);
        Some(previous)
    }
}

fn build_record(
    set: &PerformanceSet,
    record_type: RecordType,
    value: f64,
    unit: &str,
    previous_record: Option<f64>,
    at_weight: Option<f64>,
) -> PersonalRecord {
    let improvement = match previous_record {
        Some(previous) => value - previous,
        None => value,
    };
    let improvement_percentage = match previous_record {
        Some(previous) if previous > 0.0 => (improvement / previous) * 100.0,
        _ => 100.0,
    };

    trace!(
        exercise_id = %set.exercise_id,
        record_type = %record_type,
        value,
        "personal record"
    );

    PersonalRecord {
        id: record_id(&set.exercise_id, record_type, set.completed_at, value, at_weight),
        exercise_id: set.exercise_id.clone(),
        exercise_name: set.exercise_name.clone(),
        record_type,
        value,
        unit: unit.to_string(),
        at_weight,
        achieved_at: set.completed_at,
        workout_id: set.workout_id.clone(),
        previous_record,
        improvement,
        improvement_percentage,
    }
}

/// Stable id for an (exercise, metric, time, value) key; reps ids also carry
/// the weight. Sets sharing their workout's timestamp stay distinct through
/// the value, which strictly increases within one metric.
pub fn record_id(
    exercise_id: &str,
    record_type: RecordType,
    achieved_at: DateTime<Utc>,
    value: f64,
    at_weight: Option<f64>,
) -> Uuid {
    let mut key = format!(
        "{}|{}|{}|{}",
        exercise_id,
        record_type.as_str(),
        achieved_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        value
    );
    if let Some(weight) = at_weight {
        key.push('|');
        key.push_str(&weight.to_string());
    }
    Uuid::new_v5(&RECORD_NAMESPACE, key.as_bytes())
}
