//! Insight generation
//!
//! Turns trends, entry counts, anomalies and exercise progress into a ranked
//! list of short human-readable insights.

use chrono::{DateTime, Duration, Utc};

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::measurements::{group_by_type, AnomalyDetector, TrendCalculator};
use crate::types::{
    ExerciseProgress, Insight, InsightPriority, InsightType, Measurement, ProgressTrend,
    TrendDirection,
};

/// Records newer than this produce a personal-record insight
const RECENT_RECORD_DAYS: i64 = 7;

/// Exercises idle for longer than this produce an inactivity insight
const INACTIVITY_DAYS: i64 = 14;

/// Generator for measurement and workout insights
#[derive(Debug, Clone)]
pub struct InsightGenerator {
    config: AnalyticsConfig,
    anomalies: AnomalyDetector,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self {
            config: AnalyticsConfig::default(),
            anomalies: AnomalyDetector::default(),
        }
    }
}

impl InsightGenerator {
    /// Create a generator; an invalid configuration is rejected
    pub fn new(config: AnalyticsConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let anomalies = AnomalyDetector::from_config(&config)?;
        Ok(Self { config, anomalies })
    }

    /// Measurement insights, highest priority first.
    ///
    /// Trend insights are generated first, then milestones, then anomalies;
    /// the stable sort keeps that order inside a priority tier.
    pub fn measurement_insights(
        &self,
        measurements: &[Measurement],
        now: DateTime<Utc>,
    ) -> Vec<Insight> {
        let groups = group_by_type(measurements);
        let period = self.config.insight_trend_period;
        let trends = TrendCalculator::from_config(&self.config);

        let mut insights = Vec::new();

        for measurement_type in groups.keys() {
            let Some(trend) = trends.calculate(measurements, measurement_type, period, now) else {
                continue;
            };
            let magnitude = trend.change_percent.abs();
            if magnitude <= self.config.insight_trend_pct {
                continue;
            }
            let direction = match trend.trend {
                TrendDirection::Down => "decreased",
                _ => "increased",
            };
            insights.push(Insight {
                insight_type: InsightType::Trend,
                title: format!("{} {}", display_name(measurement_type), direction),
                description: format!(
                    "Your {} {} by {:.1}% over the last {} ({} to {}).",
                    display_name(measurement_type).to_lowercase(),
                    direction,
                    magnitude,
                    period.as_str(),
                    format_value(trend.previous),
                    format_value(trend.current),
                ),
                priority: if magnitude > self.config.insight_high_priority_pct {
                    InsightPriority::High
                } else {
                    InsightPriority::Medium
                },
                subject: Some(measurement_type.clone()),
            });
        }

        for (measurement_type, entries) in &groups {
            if entries.len() >= self.config.milestone_entries {
                insights.push(Insight {
                    insight_type: InsightType::Milestone,
                    title: format!("{} tracking milestone", display_name(measurement_type)),
                    description: format!(
                        "You have logged {} {} measurements. Consistent tracking makes trends reliable.",
                        entries.len(),
                        display_name(measurement_type).to_lowercase(),
                    ),
                    priority: InsightPriority::Low,
                    subject: Some(measurement_type.clone()),
                });
            }
        }

        for (measurement_type, flagged) in self.anomalies.detect_all(measurements) {
            insights.push(Insight {
                insight_type: InsightType::Anomaly,
                title: format!(
                    "Unusual {} reading",
                    display_name(&measurement_type).to_lowercase()
                ),
                description: format!(
                    "{} {} reading{} differ{} noticeably from your usual range. Double-check the entry or watch for a change.",
                    flagged.len(),
                    display_name(&measurement_type).to_lowercase(),
                    if flagged.len() == 1 { "" } else { "s" },
                    if flagged.len() == 1 { "s" } else { "" },
                ),
                priority: InsightPriority::Medium,
                subject: Some(measurement_type),
            });
        }

        rank(insights)
    }

    /// Workout insights from per-exercise progress, highest priority first
    pub fn workout_insights(
        &self,
        progress: &[ExerciseProgress],
        now: DateTime<Utc>,
    ) -> Vec<Insight> {
        let mut insights = Vec::new();
        let record_cutoff = now - Duration::days(RECENT_RECORD_DAYS);

        for exercise in progress {
            let recent = exercise
                .records
                .iter()
                .filter(|r| r.achieved_at >= record_cutoff)
                .count();
            if recent > 0 {
                insights.push(Insight {
                    insight_type: InsightType::PersonalRecord,
                    title: format!("New personal record in {}", exercise.exercise_name),
                    description: format!(
                        "You set {} personal record{} in {} this week.",
                        recent,
                        if recent == 1 { "" } else { "s" },
                        exercise.exercise_name,
                    ),
                    priority: InsightPriority::High,
                    subject: Some(exercise.exercise_id.clone()),
                });
            }
        }

        for exercise in progress {
            if exercise.progress_trend == ProgressTrend::Declining {
                insights.push(Insight {
                    insight_type: InsightType::Decline,
                    title: format!("{} is trending down", exercise.exercise_name),
                    description: format!(
                        "Your recent {} sessions are below your previous ones. Consider a deload or extra recovery.",
                        exercise.exercise_name,
                    ),
                    priority: InsightPriority::Medium,
                    subject: Some(exercise.exercise_id.clone()),
                });
            }
        }

        for exercise in progress {
            let idle_days = (now - exercise.last_performed).num_days();
            if idle_days > INACTIVITY_DAYS {
                insights.push(Insight {
                    insight_type: InsightType::Inactivity,
                    title: format!("Time to revisit {}", exercise.exercise_name),
                    description: format!(
                        "You last performed {} {} days ago.",
                        exercise.exercise_name, idle_days,
                    ),
                    priority: InsightPriority::Low,
                    subject: Some(exercise.exercise_id.clone()),
                });
            }
        }

        rank(insights)
    }
}

/// Stable sort by descending priority
pub fn rank(mut insights: Vec<Insight>) -> Vec<Insight> {
    insights.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
    insights
}

/// "body_weight" -> "Body weight"
fn display_name(measurement_type: &str) -> String {
    let spaced = measurement_type.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_value(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    rounded.to_string()
}
