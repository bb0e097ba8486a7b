//! Exercise progress aggregation
//!
//! Summarizes an exercise's sets and detected records into averages, bests,
//! a qualitative trend and a 0-100 progress score.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::config::AnalyticsConfig;
use crate::types::{ExerciseProgress, PerformanceSet, PersonalRecord, ProgressTrend};

/// Starting point of the progress score
const BASE_SCORE: i32 = 50;

/// Recency bonus as (max days since last session, points)
const RECENCY_BONUS: [(i64, i32); 4] = [(3, 20), (7, 15), (14, 10), (30, 5)];

const POINTS_PER_ACTIVE_WEEK: i32 = 2;
const MAX_CONSISTENCY_POINTS: i32 = 15;
const POINTS_PER_RECENT_RECORD: i32 = 5;
const MAX_RECORD_POINTS: i32 = 15;
const RECENT_RECORD_DAYS: i64 = 30;

/// Aggregator for per-exercise progress summaries
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    window: usize,
    min_sets: usize,
    change_threshold: f64,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::from_config(&AnalyticsConfig::default())
    }
}

impl ProgressAggregator {
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self {
            window: config.trend_window_sets,
            min_sets: config.min_trend_sets,
            change_threshold: config.trend_change_threshold,
        }
    }

    /// Summarize one exercise. Returns `None` for an empty set list.
    ///
    /// `sets` must be ordered by `completed_at`; `records` are the records
    /// detected for the same sets.
    pub fn aggregate(
        &self,
        sets: &[PerformanceSet],
        records: Vec<PersonalRecord>,
        now: DateTime<Utc>,
    ) -> Option<ExerciseProgress> {
        let first = sets.first()?;
        let last_performed = sets.iter().map(|s| s.completed_at).max()?;

        let strength: Vec<&PerformanceSet> = sets.iter().filter(|s| s.is_strength()).collect();
        let volumes: Vec<f64> = strength.iter().map(|s| s.volume()).collect();

        let sessions: BTreeSet<&str> = sets.iter().map(|s| s.workout_id.as_str()).collect();

        let progress_trend = self.classify_trend(sets);
        let progress_score = progress_score(sets, &records, last_performed, now);

        Some(ExerciseProgress {
            exercise_id: first.exercise_id.clone(),
            exercise_name: first.exercise_name.clone(),
            progress_trend,
            total_sessions: sessions.len(),
            total_sets: sets.len(),
            last_performed,
            average_weight: mean(strength.iter().map(|s| s.weight)).unwrap_or(0.0),
            average_reps: mean(strength.iter().map(|s| s.reps as f64)).unwrap_or(0.0),
            average_volume: mean(volumes.iter().copied()).unwrap_or(0.0),
            best_weight: strength.iter().map(|s| s.weight).fold(0.0, f64::max),
            best_reps: strength.iter().map(|s| s.reps).max().unwrap_or(0),
            best_volume: volumes.iter().copied().fold(0.0, f64::max),
            total_volume: volumes.iter().sum(),
            estimated_one_rep_max: strength
                .iter()
                .map(|s| estimate_one_rep_max(s.weight, s.reps))
                .reduce(f64::max),
            best_duration_seconds: sets
                .iter()
                .filter_map(|s| s.positive_duration())
                .reduce(f64::max),
            best_distance_meters: sets
                .iter()
                .filter_map(|s| s.distance_meters.filter(|d| *d > 0.0))
                .reduce(f64::max),
            progress_score,
            records,
        })
    }

    /// Summarize every exercise group, pairing it with its records
    pub fn aggregate_all(
        &self,
        groups: &BTreeMap<String, Vec<PerformanceSet>>,
        records: &BTreeMap<String, Vec<PersonalRecord>>,
        now: DateTime<Utc>,
    ) -> Vec<ExerciseProgress> {
        groups
            .iter()
            .filter_map(|(exercise_id, sets)| {
                let exercise_records = records.get(exercise_id).cloned().unwrap_or_default();
                self.aggregate(sets, exercise_records, now)
            })
            .collect()
    }

    /// Compare the most recent window against the one before it.
    ///
    /// Exercises with fewer than `min_sets` sets in total are stable.
    /// Strength exercises compare volume; exercises without strength sets
    /// compare duration instead.
    pub fn classify_trend(&self, sets: &[PerformanceSet]) -> ProgressTrend {
        if sets.len() < self.min_sets {
            return ProgressTrend::Stable;
        }

        let mut series: Vec<f64> = sets
            .iter()
            .filter(|s| s.is_strength())
            .map(|s| s.volume())
            .collect();
        if series.is_empty() {
            series = sets.iter().filter_map(|s| s.positive_duration()).collect();
        }

        let recent_start = series.len().saturating_sub(self.window);
        let older_start = recent_start.saturating_sub(self.window);
        let recent = &series[recent_start..];
        let older = &series[older_start..recent_start];

        let (Some(recent_avg), Some(older_avg)) =
            (mean(recent.iter().copied()), mean(older.iter().copied()))
        else {
            return ProgressTrend::Stable;
        };
        if older_avg <= 0.0 {
            return ProgressTrend::Stable;
        }

        let change = (recent_avg - older_avg) / older_avg;
        if change > self.change_threshold {
            ProgressTrend::Improving
        } else if change < -self.change_threshold {
            ProgressTrend::Declining
        } else {
            ProgressTrend::Stable
        }
    }
}

/// Weighted heuristic: base 50, plus recency, weekly consistency and recent records
fn progress_score(
    sets: &[PerformanceSet],
    records: &[PersonalRecord],
    last_performed: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u8 {
    let days_since = (now - last_performed).num_days().max(0);
    let recency = RECENCY_BONUS
        .iter()
        .find(|(max_days, _)| days_since <= *max_days)
        .map(|(_, points)| *points)
        .unwrap_or(0);

    let weeks: BTreeSet<(i32, u32)> = sets
        .iter()
        .map(|s| {
            let week = s.completed_at.iso_week();
            (week.year(), week.week())
        })
        .collect();
    let consistency = (weeks.len() as i32 * POINTS_PER_ACTIVE_WEEK).min(MAX_CONSISTENCY_POINTS);

    let cutoff = now - Duration::days(RECENT_RECORD_DAYS);
    let recent_records = records.iter().filter(|r| r.achieved_at >= cutoff).count() as i32;
    let record_points = (recent_records * POINTS_PER_RECENT_RECORD).min(MAX_RECORD_POINTS);

    (BASE_SCORE + recency + consistency + record_points).clamp(0, 100) as u8
}

/// Epley one-rep-max estimate; a single is taken at face value
pub fn estimate_one_rep_max(weight: f64, reps: u32) -> f64 {
    if reps <= 1 {
        weight
    } else {
        weight * (1.0 + reps as f64 / 30.0)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordDetector;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn make_set(weight: f64, reps: u32, days_ago: i64, workout: &str) -> PerformanceSet {
        PerformanceSet {
            set_id: None,
            exercise_id: "bench".to_string(),
            exercise_name: "Bench Press".to_string(),
            weight,
            reps,
            duration_seconds: None,
            distance_meters: None,
            completed_at: now() - Duration::days(days_ago),
            workout_id: workout.to_string(),
        }
    }

    fn series(volumes_as_weights: &[f64]) -> Vec<PerformanceSet> {
        let len = volumes_as_weights.len() as i64;
        volumes_as_weights
            .iter()
            .enumerate()
            .map(|(i, w)| make_set(*w, 1, len - i as i64, &format!("w{i}")))
            .collect()
    }

    #[test]
    fn test_trend_needs_minimum_sets() {
        let aggregator = ProgressAggregator::default();
        let sets = series(&[50.0, 60.0, 200.0]);
        assert_eq!(aggregator.classify_trend(&sets), ProgressTrend::Stable);
    }

    #[test]
    fn test_trend_without_older_window_is_stable() {
        let aggregator = ProgressAggregator::default();
        let sets = series(&[50.0, 60.0, 70.0, 80.0, 90.0, 100.0]);
        assert_eq!(aggregator.classify_trend(&sets), ProgressTrend::Stable);
    }

    #[test]
    fn test_trend_improving_and_declining() {
        let aggregator = ProgressAggregator::default();

        let mut weights = vec![100.0; 6];
        weights.extend(vec![110.0; 6]);
        assert_eq!(
            aggregator.classify_trend(&series(&weights)),
            ProgressTrend::Improving
        );

        let mut weights = vec![100.0; 6];
        weights.extend(vec![90.0; 6]);
        assert_eq!(
            aggregator.classify_trend(&series(&weights)),
            ProgressTrend::Declining
        );

        // +4% stays inside the band
        let mut weights = vec![100.0; 6];
        weights.extend(vec![104.0; 6]);
        assert_eq!(
            aggregator.classify_trend(&series(&weights)),
            ProgressTrend::Stable
        );
    }

    #[test]
    fn test_trend_uses_only_preceding_window() {
        let aggregator = ProgressAggregator::default();
        // Sets 13+ back are ignored: a huge early value must not drag the older window
        let mut weights = vec![1000.0; 3];
        weights.extend(vec![100.0; 6]);
        weights.extend(vec![120.0; 6]);
        assert_eq!(
            aggregator.classify_trend(&series(&weights)),
            ProgressTrend::Improving
        );
    }

    #[test]
    fn test_trend_falls_back_to_duration() {
        let aggregator = ProgressAggregator::default();
        let sets: Vec<PerformanceSet> = (0..12)
            .map(|i| {
                let mut set = make_set(0.0, 0, 12 - i, &format!("w{i}"));
                set.duration_seconds = Some(if i < 6 { 1200.0 } else { 1500.0 });
                set
            })
            .collect();
        assert_eq!(aggregator.classify_trend(&sets), ProgressTrend::Improving);
    }

    #[test]
    fn test_aggregate_summary_values() {
        let sets = vec![
            make_set(100.0, 5, 10, "w1"),
            make_set(100.0, 8, 10, "w1"),
            make_set(110.0, 5, 2, "w2"),
        ];
        let records = RecordDetector::default().detect(&sets);
        let progress = ProgressAggregator::default()
            .aggregate(&sets, records, now())
            .unwrap();

        assert_eq!(progress.total_sessions, 2);
        assert_eq!(progress.total_sets, 3);
        assert_eq!(progress.last_performed, now() - Duration::days(2));
        assert_eq!(progress.best_weight, 110.0);
        assert_eq!(progress.best_reps, 8);
        assert_eq!(progress.best_volume, 800.0);
        assert_eq!(progress.total_volume, 1850.0);
        assert!((progress.average_weight - 310.0 / 3.0).abs() < 1e-9);
        assert!((progress.average_reps - 6.0).abs() < 1e-9);
        let one_rep_max = progress.estimated_one_rep_max.unwrap();
        assert!((one_rep_max - 110.0 * (1.0 + 5.0 / 30.0)).abs() < 1e-9);
        assert_eq!(progress.best_duration_seconds, None);
    }

    #[test]
    fn test_progress_score_components() {
        // Two ISO weeks, last session 2 days ago, 7 recent records capped at 15
        let sets = vec![
            make_set(100.0, 5, 10, "w1"),
            make_set(100.0, 8, 10, "w1"),
            make_set(110.0, 5, 2, "w2"),
        ];
        let records = RecordDetector::default().detect(&sets);
        assert!(records.len() >= 3);

        let score = progress_score(&sets, &records, now() - Duration::days(2), now());
        assert_eq!(score, 50 + 20 + 4 + 15);
    }

    #[test]
    fn test_progress_score_without_recent_activity() {
        let sets = vec![make_set(100.0, 5, 60, "w1")];
        let score = progress_score(&sets, &[], now() - Duration::days(60), now());
        assert_eq!(score, 50 + 2);
    }

    #[test]
    fn test_progress_score_recency_tiers() {
        // whole days only: 3 days 23 hours still counts as 3
        let cases = [
            (Duration::days(3), 20),
            (Duration::days(3) + Duration::hours(23), 20),
            (Duration::days(4), 15),
            (Duration::days(7), 15),
            (Duration::days(7) + Duration::hours(23), 15),
            (Duration::days(8), 10),
            (Duration::days(14), 10),
            (Duration::days(15), 5),
            (Duration::days(30), 5),
            (Duration::days(31), 0),
        ];
        for (since, bonus) in cases {
            let score = progress_score(&[], &[], now() - since, now());
            assert_eq!(score, (BASE_SCORE + bonus) as u8, "{since:?}");
        }
    }

    #[test]
    fn test_trend_gate_counts_all_sets() {
        let aggregator = ProgressAggregator::default();

        // 3 strength sets plus 2 cardio sets reach the minimum
        let mut sets = series(&[100.0, 100.0, 200.0]);
        for i in 0..2 {
            let mut cardio = make_set(0.0, 0, 0, &format!("c{i}"));
            cardio.duration_seconds = Some(600.0);
            sets.push(cardio);
        }
        let small_window = ProgressAggregator {
            window: 1,
            ..aggregator
        };
        assert_eq!(small_window.classify_trend(&sets), ProgressTrend::Improving);
        assert_eq!(small_window.classify_trend(&sets[..3]), ProgressTrend::Stable);
    }

    #[test]
    fn test_progress_score_maximum() {
        // Weekly sessions for 20 weeks, each one heavier than the last
        let sets: Vec<PerformanceSet> = (0..20)
            .map(|i| make_set(200.0 - i as f64, 5, i * 7, &format!("w{i}")))
            .collect();
        let mut ordered = sets.clone();
        ordered.sort_by_key(|s| s.completed_at);
        let records = RecordDetector::default().detect(&ordered);

        let score = progress_score(&ordered, &records, now(), now());
        assert_eq!(score, 100);
    }

    #[test]
    fn test_empty_sets() {
        let progress = ProgressAggregator::default().aggregate(&[], Vec::new(), now());
        assert!(progress.is_none());
    }

    #[test]
    fn test_one_rep_max_single() {
        assert_eq!(estimate_one_rep_max(140.0, 1), 140.0);
        assert!((estimate_one_rep_max(100.0, 10) - 133.333_333).abs() < 1e-4);
    }
}
