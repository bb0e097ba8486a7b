//! Set normalization and exercise grouping
//!
//! This module flattens nested workout logs into per-set performance records:
//! - Incomplete sets are dropped
//! - Sets without a usable load/reps pair or cardio measurement are dropped
//! - Timestamps fall back to the workout's completion time
//!
//! Dropping is silent for callers; each skip is logged at debug level.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{ExerciseLog, PerformanceSet, SetLog, WorkoutLog};

/// Normalizer for turning workout logs into flat performance sets
pub struct SetNormalizer;

impl SetNormalizer {
    /// Flatten workouts into sets ordered by completion time.
    ///
    /// The sort is stable, so sets sharing a timestamp keep their input order.
    pub fn normalize(workouts: &[WorkoutLog]) -> Vec<PerformanceSet> {
        let mut sets = Vec::new();
        let mut dropped = 0usize;

        for workout in workouts {
            for exercise in &workout.exercises {
                for (index, set) in exercise.sets.iter().enumerate() {
                    match normalize_set(workout, exercise, set) {
                        Some(normalized) => sets.push(normalized),
                        None => {
                            dropped += 1;
                            debug!(
                                workout_id = %workout.id,
                                exercise_id = %exercise.exercise_id,
                                set_index = index,
                                "dropping set without usable performance data"
                            );
                        }
                    }
                }
            }
        }

        sets.sort_by_key(|s| s.completed_at);

        debug!(kept = sets.len(), dropped, "normalized workout sets");
        sets
    }

    /// Partition sets by exercise id, keeping chronological order within each group
    pub fn group_by_exercise(sets: Vec<PerformanceSet>) -> BTreeMap<String, Vec<PerformanceSet>> {
        let mut groups: BTreeMap<String, Vec<PerformanceSet>> = BTreeMap::new();
        for set in sets {
            groups.entry(set.exercise_id.clone()).or_default().push(set);
        }
        groups
    }

    /// Normalize and group in one step
    pub fn normalize_grouped(workouts: &[WorkoutLog]) -> BTreeMap<String, Vec<PerformanceSet>> {
        Self::group_by_exercise(Self::normalize(workouts))
    }
}

/// Validate a single set; `None` means the set does not participate
fn normalize_set(
    workout: &WorkoutLog,
    exercise: &ExerciseLog,
    set: &SetLog,
) -> Option<PerformanceSet> {
    if !set.completed || exercise.exercise_id.is_empty() {
        return None;
    }

    let completed_at = set.completed_at.or(workout.completed_at)?;

    let weight = sanitize(set.weight)?;
    let duration_seconds = sanitize(set.duration_seconds)?;
    let distance_meters = sanitize(set.distance_meters)?;
    let reps = set.reps.unwrap_or(0);

    let has_strength = weight.unwrap_or(0.0) > 0.0 && reps > 0;
    let has_cardio =
        duration_seconds.unwrap_or(0.0) > 0.0 || distance_meters.unwrap_or(0.0) > 0.0;

    if !has_strength && !has_cardio {
        return None;
    }

    Some(PerformanceSet {
        set_id: set.id.clone(),
        exercise_id: exercise.exercise_id.clone(),
        exercise_name: exercise.exercise_name.clone(),
        weight: weight.unwrap_or(0.0),
        reps,
        duration_seconds,
        distance_meters,
        completed_at,
        workout_id: workout.id.clone(),
    })
}

/// Outer `None` marks a malformed value (non-finite or negative);
/// inner `None` is simply an absent field.
fn sanitize(value: Option<f64>) -> Option<Option<f64>> {
    match value {
        None => Some(None),
        Some(v) if v.is_finite() && v >= 0.0 => Some(Some(v)),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn strength_set(weight: f64, reps: u32, time: DateTime<Utc>) -> SetLog {
        SetLog {
            weight: Some(weight),
            reps: Some(reps),
            completed: true,
            completed_at: Some(time),
            ..Default::default()
        }
    }

    fn workout(id: &str, exercise_id: &str, sets: Vec<SetLog>) -> WorkoutLog {
        WorkoutLog {
            id: id.to_string(),
            completed_at: None,
            exercises: vec![ExerciseLog {
                exercise_id: exercise_id.to_string(),
                exercise_name: exercise_id.to_uppercase(),
                sets,
            }],
        }
    }

    #[test]
    fn test_drops_incomplete_and_empty_sets() {
        let mut incomplete = strength_set(100.0, 5, at(1, 10));
        incomplete.completed = false;
        let empty = SetLog {
            completed: true,
            completed_at: Some(at(1, 10)),
            ..Default::default()
        };
        let zero_reps = strength_set(100.0, 0, at(1, 10));

        let sets = SetNormalizer::normalize(&[workout(
            "w1",
            "squat",
            vec![incomplete, empty, zero_reps, strength_set(100.0, 5, at(1, 11))],
        )]);

        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].reps, 5);
        assert_eq!(sets[0].workout_id, "w1");
    }

    #[test]
    fn test_keeps_cardio_sets() {
        let run = SetLog {
            duration_seconds: Some(1800.0),
            distance_meters: Some(5000.0),
            completed: true,
            completed_at: Some(at(2, 7)),
            ..Default::default()
        };
        let sets = SetNormalizer::normalize(&[workout("w1", "run", vec![run])]);

        assert_eq!(sets.len(), 1);
        assert!(!sets[0].is_strength());
        assert_eq!(sets[0].positive_duration(), Some(1800.0));
    }

    #[test]
    fn test_skips_non_finite_values() {
        let bad = SetLog {
            weight: Some(f64::NAN),
            reps: Some(5),
            completed: true,
            completed_at: Some(at(1, 10)),
            ..Default::default()
        };
        let sets = SetNormalizer::normalize(&[workout(
            "w1",
            "bench",
            vec![bad, strength_set(60.0, 8, at(1, 11))],
        )]);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].weight, 60.0);
    }

    #[test]
    fn test_falls_back_to_workout_timestamp() {
        let mut w = workout(
            "w1",
            "row",
            vec![SetLog {
                weight: Some(50.0),
                reps: Some(10),
                completed: true,
                ..Default::default()
            }],
        );
        w.completed_at = Some(at(5, 18));

        let sets = SetNormalizer::normalize(&[w.clone()]);
        assert_eq!(sets[0].completed_at, at(5, 18));

        w.completed_at = None;
        assert!(SetNormalizer::normalize(&[w]).is_empty());
    }

    #[test]
    fn test_groups_in_chronological_order() {
        let later = workout("w2", "squat", vec![strength_set(110.0, 5, at(3, 10))]);
        let earlier = workout(
            "w1",
            "squat",
            vec![
                strength_set(100.0, 5, at(1, 10)),
                strength_set(100.0, 6, at(1, 10)),
            ],
        );
        let bench = workout("w1", "bench", vec![strength_set(60.0, 5, at(1, 9))]);

        let groups = SetNormalizer::normalize_grouped(&[later, earlier, bench]);

        assert_eq!(groups.len(), 2);
        let squat = &groups["squat"];
        let weights_reps: Vec<(f64, u32)> = squat.iter().map(|s| (s.weight, s.reps)).collect();
        assert_eq!(weights_reps, vec![(100.0, 5), (100.0, 6), (110.0, 5)]);
    }
}
