//! Measurement corpus statistics
//!
//! Counts, most-tracked type, logging frequency and the logging streak, plus
//! per-type descriptive summaries.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::{AnalyticsConfig, StreakRule};
use crate::measurements::{group_by_type, valid_entries};
use crate::types::{Measurement, MeasurementStats, MeasurementSummary};

const DAYS_PER_WEEK: f64 = 7.0;

/// Calculator for corpus-wide measurement statistics
#[derive(Debug, Clone, Default)]
pub struct StatisticsCalculator {
    streak_rule: StreakRule,
}

impl StatisticsCalculator {
    pub fn new(streak_rule: StreakRule) -> Self {
        Self { streak_rule }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.streak_rule)
    }

    /// Statistics for the whole corpus as of `now`
    pub fn calculate(&self, measurements: &[Measurement], now: DateTime<Utc>) -> MeasurementStats {
        let entries: Vec<&Measurement> = valid_entries(measurements).collect();

        // Counts kept in first-seen order so ties resolve to the earliest type
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for m in &entries {
            match counts.iter_mut().find(|(t, _)| *t == m.measurement_type) {
                Some((_, count)) => *count += 1,
                None => counts.push((m.measurement_type.as_str(), 1)),
            }
        }

        let mut most_tracked: Option<(&str, usize)> = None;
        for &(measurement_type, count) in &counts {
            if most_tracked.map_or(true, |(_, best)| count > best) {
                most_tracked = Some((measurement_type, count));
            }
        }

        let average_frequency = match entries.iter().map(|m| m.date).min() {
            Some(oldest) => {
                let days = (now - oldest).num_days().max(1) as f64;
                entries.len() as f64 / days * DAYS_PER_WEEK
            }
            None => 0.0,
        };

        let dates: BTreeSet<NaiveDate> = entries.iter().map(|m| m.date.date_naive()).collect();

        MeasurementStats {
            total_measurements: entries.len(),
            measurement_types: counts.len(),
            streak_days: streak_days(&dates, now.date_naive(), self.streak_rule),
            most_tracked_type: most_tracked.map(|(t, _)| t.to_string()),
            average_frequency,
        }
    }
}

/// Walk logged dates backwards from `today`.
///
/// The gap between the cursor and the next logged date decides the credit:
/// a same-day match adds 1, a one-day step adds 2 under [`StreakRule::Compat`]
/// (1 under [`StreakRule::Linear`]), and anything larger ends the streak.
/// Dates after `today` are ignored.
pub fn streak_days(dates: &BTreeSet<NaiveDate>, today: NaiveDate, rule: StreakRule) -> u32 {
    let mut streak = 0u32;
    let mut cursor = today;

    for date in dates.iter().rev().filter(|d| **d <= today) {
        let gap = (cursor - *date).num_days();
        match gap {
            0 => streak += 1,
            1 => {
                streak += match rule {
                    StreakRule::Compat => 2,
                    StreakRule::Linear => 1,
                }
            }
            _ => break,
        }
        cursor = *date;
    }

    streak
}

/// Descriptive summary for each measurement type, ordered by type name
pub fn summarize(measurements: &[Measurement]) -> Vec<MeasurementSummary> {
    group_by_type(measurements)
        .into_iter()
        .filter_map(|(measurement_type, entries)| {
            let first = entries.first()?;
            let last = entries.last()?;
            let values: Vec<f64> = entries.iter().map(|m| m.value).collect();

            Some(MeasurementSummary {
                count: values.len(),
                unit: last.unit.clone(),
                latest: last.value,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                average: values.iter().sum::<f64>() / values.len() as f64,
                first_date: first.date,
                last_date: last.date,
                measurement_type,
            })
        })
        .collect()
}
