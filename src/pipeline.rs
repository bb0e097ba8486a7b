//! Pipeline orchestration
//!
//! This module provides the public API of the progress engine. It wires the
//! normalizer, record detector, aggregator, measurement calculators and
//! insight generator together and offers JSON-in/JSON-out helpers for hosts.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::insights::{rank, InsightGenerator};
use crate::measurements::{
    bmi, bmi_category, group_by_type, navy_body_fat, summarize, AnomalyDetector,
    CorrelationAnalyzer, StatisticsCalculator, TrendCalculator,
};
use crate::normalizer::SetNormalizer;
use crate::progress::ProgressAggregator;
use crate::records::RecordDetector;
use crate::types::{
    ExerciseLog, Insight, Measurement, MeasurementReport, MeasurementTrend, TrendPeriod,
    WorkoutLog, WorkoutReport,
};

/// Analyze a JSON array of workouts into a JSON [`WorkoutReport`].
///
/// # Arguments
/// * `workouts_json` - JSON array of completed workouts
/// * `now` - Reference time for recency-dependent values
pub fn workouts_to_report_json(
    workouts_json: &str,
    now: DateTime<Utc>,
) -> Result<String, AnalyticsError> {
    ProgressEngine::new().workouts_json(workouts_json, now)
}

/// Analyze a JSON array of measurements into a JSON [`MeasurementReport`].
pub fn measurements_to_report_json(
    measurements_json: &str,
    now: DateTime<Utc>,
) -> Result<String, AnalyticsError> {
    ProgressEngine::new().measurements_json(measurements_json, now)
}

/// Context-free analytics service.
///
/// Holds only configuration; every call is a pure function of its inputs and
/// the supplied reference time.
#[derive(Debug, Clone, Default)]
pub struct ProgressEngine {
    config: AnalyticsConfig,
    insights: InsightGenerator,
}

impl ProgressEngine {
    /// Create an engine with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with validated custom thresholds
    pub fn with_config(config: AnalyticsConfig) -> Result<Self, AnalyticsError> {
        let insights = InsightGenerator::new(config.clone())?;
        Ok(Self { config, insights })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Records, per-exercise progress and workout insights.
    ///
    /// Pipeline stages:
    /// 1. SetNormalizer - Flatten, validate and group sets per exercise
    /// 2. RecordDetector - Scan each exercise for personal records
    /// 3. ProgressAggregator - Summarize each exercise
    /// 4. InsightGenerator - Derive workout insights
    pub fn analyze_workouts(&self, workouts: &[WorkoutLog], now: DateTime<Utc>) -> WorkoutReport {
        let groups = SetNormalizer::normalize_grouped(workouts);

        let detector = RecordDetector::new(self.config.weight_unit.clone());
        let records_by_exercise = detector.detect_all(&groups);

        let progress = ProgressAggregator::from_config(&self.config).aggregate_all(
            &groups,
            &records_by_exercise,
            now,
        );

        let mut records: Vec<_> = records_by_exercise.into_values().flatten().collect();
        records.sort_by(|a, b| {
            a.achieved_at
                .cmp(&b.achieved_at)
                .then_with(|| a.exercise_id.cmp(&b.exercise_id))
                .then(a.record_type.cmp(&b.record_type))
        });

        let insights = self.insights.workout_insights(&progress, now);

        debug!(
            workouts = workouts.len(),
            exercises = progress.len(),
            records = records.len(),
            insights = insights.len(),
            "analyzed workouts"
        );

        WorkoutReport {
            computed_for: now,
            records,
            progress,
            insights,
        }
    }

    /// Statistics, summaries, trends, anomalies, BMI and insights for a
    /// measurement corpus. Trends use the configured insight period.
    pub fn analyze_measurements(
        &self,
        measurements: &[Measurement],
        now: DateTime<Utc>,
    ) -> Result<MeasurementReport, AnalyticsError> {
        let stats = StatisticsCalculator::from_config(&self.config).calculate(measurements, now);
        let summaries = summarize(measurements);

        let period = self.config.insight_trend_period;
        let calculator = TrendCalculator::from_config(&self.config);
        let trends: Vec<MeasurementTrend> = group_by_type(measurements)
            .keys()
            .filter_map(|t| calculator.calculate(measurements, t, period, now))
            .collect();

        let anomalies = AnomalyDetector::from_config(&self.config)?.detect_all(measurements);

        let bmi = bmi(measurements);
        let insights = self.insights.measurement_insights(measurements, now);

        debug!(
            measurements = measurements.len(),
            types = stats.measurement_types,
            trends = trends.len(),
            anomalous_types = anomalies.len(),
            insights = insights.len(),
            "analyzed measurements"
        );

        Ok(MeasurementReport {
            computed_for: now,
            stats,
            summaries,
            trends,
            anomalies,
            bmi_category: bmi.map(bmi_category),
            bmi,
            insights,
        })
    }

    /// Workout and measurement insights merged by priority.
    ///
    /// Within a priority tier workout insights come before measurement ones.
    pub fn insights(
        &self,
        workouts: &[WorkoutLog],
        measurements: &[Measurement],
        now: DateTime<Utc>,
    ) -> Vec<Insight> {
        let progress = self.analyze_workouts(workouts, now).progress;

        let mut merged = self.insights.workout_insights(&progress, now);
        merged.extend(self.insights.measurement_insights(measurements, now));
        rank(merged)
    }

    /// Trend of one measurement type over `period`
    pub fn trend(
        &self,
        measurements: &[Measurement],
        measurement_type: &str,
        period: TrendPeriod,
        now: DateTime<Utc>,
    ) -> Option<MeasurementTrend> {
        TrendCalculator::from_config(&self.config).calculate(
            measurements,
            measurement_type,
            period,
            now,
        )
    }

    /// Pearson correlation of two measurement types on shared dates
    pub fn correlate(
        &self,
        measurements: &[Measurement],
        type_a: &str,
        type_b: &str,
    ) -> Option<f64> {
        CorrelationAnalyzer::from_config(&self.config).correlate(measurements, type_a, type_b)
    }

    /// Flagged entries of one type using the configured threshold
    pub fn anomalies(
        &self,
        measurements: &[Measurement],
        measurement_type: &str,
    ) -> Result<Vec<Measurement>, AnalyticsError> {
        Ok(AnomalyDetector::from_config(&self.config)?.detect(measurements, measurement_type))
    }

    /// Navy-method body fat from the latest circumference measurements
    pub fn body_fat(
        &self,
        measurements: &[Measurement],
        gender: &str,
    ) -> Result<Option<f64>, AnalyticsError> {
        navy_body_fat(measurements, gender)
    }

    /// Parse workouts JSON and serialize the resulting report
    pub fn workouts_json(
        &self,
        workouts_json: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AnalyticsError> {
        let workouts = parse_workouts(workouts_json)?;
        let report = self.analyze_workouts(&workouts, now);
        serde_json::to_string(&report).map_err(|e| AnalyticsError::EncodingError(e.to_string()))
    }

    /// Parse measurements JSON and serialize the resulting report
    pub fn measurements_json(
        &self,
        measurements_json: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AnalyticsError> {
        let measurements = parse_measurements(measurements_json)?;
        let report = self.analyze_measurements(&measurements, now)?;
        serde_json::to_string(&report).map_err(|e| AnalyticsError::EncodingError(e.to_string()))
    }
}

/// Workout as read from JSON, before its exercises are checked one by one
#[derive(Deserialize)]
struct RawWorkout {
    id: String,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    exercises: Vec<Value>,
}

#[derive(Deserialize)]
struct RawExercise {
    exercise_id: String,
    exercise_name: String,
    #[serde(default)]
    sets: Vec<Value>,
}

/// Parse a JSON array of workouts.
///
/// Only input that is not a JSON array is an error. Malformed workouts,
/// exercises and sets are logged and skipped.
pub fn parse_workouts(json: &str) -> Result<Vec<WorkoutLog>, AnalyticsError> {
    let workouts: Vec<RawWorkout> = skip_malformed(parse_array(json, "workouts")?, "workout");

    Ok(workouts
        .into_iter()
        .map(|workout| WorkoutLog {
            id: workout.id,
            completed_at: workout.completed_at,
            exercises: skip_malformed::<RawExercise>(workout.exercises, "exercise")
                .into_iter()
                .map(|exercise| ExerciseLog {
                    exercise_id: exercise.exercise_id,
                    exercise_name: exercise.exercise_name,
                    sets: skip_malformed(exercise.sets, "set"),
                })
                .collect(),
        })
        .collect())
}

/// Parse a JSON array of measurements, skipping malformed entries
pub fn parse_measurements(json: &str) -> Result<Vec<Measurement>, AnalyticsError> {
    Ok(skip_malformed(parse_array(json, "measurements")?, "measurement"))
}

fn parse_array(json: &str, what: &str) -> Result<Vec<Value>, AnalyticsError> {
    serde_json::from_str(json).map_err(|e| AnalyticsError::ParseError(format!("{what}: {e}")))
}

/// Deserialize each element on its own, dropping the ones that fail
fn skip_malformed<T: DeserializeOwned>(values: Vec<Value>, kind: &str) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(kind, index, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}
