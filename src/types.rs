//! Core types for the progress engine
//!
//! This module defines the data structures that flow through the engine: raw
//! workout logs, normalized performance sets, derived records and progress
//! summaries, body measurements and the reports built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AnalyticsError;

// ============================================================================
// Raw workout history
// ============================================================================

/// A logged workout as handed over by the storage layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkoutLog {
    /// Workout identifier
    pub id: String,
    /// When the workout was finished; used when a set carries no timestamp
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Exercises performed in this workout
    #[serde(default)]
    pub exercises: Vec<ExerciseLog>,
}

/// One exercise within a workout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub exercise_id: String,
    pub exercise_name: String,
    #[serde(default)]
    pub sets: Vec<SetLog>,
}

/// A single set as logged by the user. Every measurement is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetLog {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    /// Whether the user ticked the set off
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Normalized sets and personal records
// ============================================================================

/// Flat, validated per-set performance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSet {
    pub set_id: Option<String>,
    pub exercise_id: String,
    pub exercise_name: String,
    /// Load in the configured weight unit (0 for bodyweight/cardio sets)
    pub weight: f64,
    pub reps: u32,
    pub duration_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    pub completed_at: DateTime<Utc>,
    pub workout_id: String,
}

impl PerformanceSet {
    /// Whether the set takes part in weight, reps and volume tracking
    pub fn is_strength(&self) -> bool {
        self.weight > 0.0 && self.reps > 0
    }

    /// Weight times reps
    pub fn volume(&self) -> f64 {
        self.weight * self.reps as f64
    }

    /// Duration, if present and positive
    pub fn positive_duration(&self) -> Option<f64> {
        self.duration_seconds.filter(|d| *d > 0.0)
    }
}

/// Metric tracked by a personal record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Weight,
    Reps,
    Volume,
    Duration,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Weight => "weight",
            RecordType::Reps => "reps",
            RecordType::Volume => "volume",
            RecordType::Duration => "duration",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A personal record event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    /// Deterministic identifier derived from exercise, metric and time
    pub id: Uuid,
    pub exercise_id: String,
    pub exercise_name: String,
    pub record_type: RecordType,
    pub value: f64,
    pub unit: String,
    /// Load the reps were performed at (reps records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_weight: Option<f64>,
    pub achieved_at: DateTime<Utc>,
    pub workout_id: String,
    pub previous_record: Option<f64>,
    pub improvement: f64,
    pub improvement_percentage: f64,
}

/// Direction of an exercise's recent performance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressTrend {
    Improving,
    Stable,
    Declining,
}

/// Per-exercise summary for one computation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    pub exercise_id: String,
    pub exercise_name: String,
    pub records: Vec<PersonalRecord>,
    pub progress_trend: ProgressTrend,
    /// Count of distinct workouts containing this exercise
    pub total_sessions: usize,
    pub total_sets: usize,
    pub last_performed: DateTime<Utc>,
    pub average_weight: f64,
    pub average_reps: f64,
    pub average_volume: f64,
    pub best_weight: f64,
    pub best_reps: u32,
    pub best_volume: f64,
    pub total_volume: f64,
    /// Epley estimate from the strongest set
    pub estimated_one_rep_max: Option<f64>,
    pub best_duration_seconds: Option<f64>,
    pub best_distance_meters: Option<f64>,
    /// Heuristic score, 0-100
    pub progress_score: u8,
}

// ============================================================================
// Body measurements
// ============================================================================

/// A dated scalar body measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(rename = "type")]
    pub measurement_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    pub date: DateTime<Utc>,
}

/// Look-back window for measurement trends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Week,
    Month,
    Quarter,
    Year,
}

impl TrendPeriod {
    /// Window length in days
    pub fn days(&self) -> i64 {
        match self {
            TrendPeriod::Week => 7,
            TrendPeriod::Month => 30,
            TrendPeriod::Quarter => 90,
            TrendPeriod::Year => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendPeriod::Week => "week",
            TrendPeriod::Month => "month",
            TrendPeriod::Quarter => "quarter",
            TrendPeriod::Year => "year",
        }
    }
}

impl FromStr for TrendPeriod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(TrendPeriod::Week),
            "month" => Ok(TrendPeriod::Month),
            "quarter" => Ok(TrendPeriod::Quarter),
            "year" => Ok(TrendPeriod::Year),
            _ => Err(AnalyticsError::UnsupportedPeriod(s.to_string())),
        }
    }
}

/// Direction of a measurement over a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Period-over-period change for one measurement type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementTrend {
    pub measurement_type: String,
    pub period: TrendPeriod,
    pub trend: TrendDirection,
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    pub change_percent: f64,
    pub data_points: usize,
}

/// Corpus-wide measurement statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementStats {
    pub total_measurements: usize,
    pub measurement_types: usize,
    pub streak_days: u32,
    pub most_tracked_type: Option<String>,
    /// Measurements per week since the oldest entry
    pub average_frequency: f64,
}

/// Descriptive statistics for a single measurement type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSummary {
    pub measurement_type: String,
    pub count: usize,
    pub unit: String,
    pub latest: f64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub first_date: DateTime<Utc>,
    pub last_date: DateTime<Utc>,
}

/// Sex used by the Navy body-fat formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(AnalyticsError::UnsupportedGender(s.to_string())),
        }
    }
}

/// WHO adult BMI bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

// ============================================================================
// Insights
// ============================================================================

/// Insight urgency. Ordering follows rank: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

impl InsightPriority {
    pub fn rank(&self) -> u8 {
        match self {
            InsightPriority::Low => 1,
            InsightPriority::Medium => 2,
            InsightPriority::High => 3,
        }
    }
}

/// Kind of insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Trend,
    Milestone,
    Anomaly,
    PersonalRecord,
    Decline,
    Inactivity,
}

/// Human-readable derived observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub priority: InsightPriority,
    /// Measurement type or exercise id the insight is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

// ============================================================================
// Reports
// ============================================================================

/// Everything derived from a workout history snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutReport {
    pub computed_for: DateTime<Utc>,
    pub records: Vec<PersonalRecord>,
    pub progress: Vec<ExerciseProgress>,
    pub insights: Vec<Insight>,
}

/// Everything derived from a measurement corpus snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub computed_for: DateTime<Utc>,
    pub stats: MeasurementStats,
    pub summaries: Vec<MeasurementSummary>,
    pub trends: Vec<MeasurementTrend>,
    pub anomalies: BTreeMap<String, Vec<Measurement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi_category: Option<BmiCategory>,
    pub insights: Vec<Insight>,
}
