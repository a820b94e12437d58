//! Exercise history derived from past workout logs.
//!
//! Logs come from both the live WAL and the CSV archive. The index built
//! here is read-only for the duration of a session.

use crate::{Result, WorkoutLog};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A weight × reps performance on a given day
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Performance {
    pub weight: f64,
    pub reps: u32,
    pub date: DateTime<Utc>,
}

/// Best and most recent performance of one exercise
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseHistory {
    pub best_weight: f64,
    pub reps_at_best_weight: u32,
    pub best_date: Option<DateTime<Utc>>,
    pub last_performance: Option<Performance>,
}

impl ExerciseHistory {
    /// The all-time best as a performance, if anything was ever lifted
    pub fn best(&self) -> Option<Performance> {
        self.best_date.map(|date| Performance {
            weight: self.best_weight,
            reps: self.reps_at_best_weight,
            date,
        })
    }

    fn record(&mut self, weight: f64, reps: u32, date: DateTime<Utc>) {
        if weight > self.best_weight
            || (weight == self.best_weight && reps > self.reps_at_best_weight)
        {
            self.best_weight = weight;
            self.reps_at_best_weight = reps;
            self.best_date = Some(date);
        }
    }
}

/// Summary of one past session for an exercise
#[derive(Clone, Debug, PartialEq)]
pub struct RecentPerformance {
    pub date: DateTime<Utc>,
    pub weight: f64,
    pub reps: u32,
    pub sets: usize,
    pub volume: f64,
}

/// Read-only per-exercise lookup over the log collection
#[derive(Clone, Debug, Default)]
pub struct HistoryIndex {
    logs: Vec<WorkoutLog>,
    exercises: HashMap<String, ExerciseHistory>,
}

impl HistoryIndex {
    /// Build the index; logs are re-sorted most-recent-first
    pub fn from_logs(mut logs: Vec<WorkoutLog>) -> Self {
        logs.sort_by(|a, b| b.date.cmp(&a.date));

        let mut exercises: HashMap<String, ExerciseHistory> = HashMap::new();
        for log in &logs {
            for exercise in &log.exercises {
                let entry = exercises.entry(exercise.name.clone()).or_default();

                for (weight, reps) in exercise.sets.iter().filter_map(|s| s.weight_reps()) {
                    entry.record(weight, reps, log.date);
                }

                // Logs are newest first, so the first one seen is the most recent
                if entry.last_performance.is_none() {
                    entry.last_performance = exercise
                        .sets
                        .iter()
                        .rev()
                        .find_map(|s| s.weight_reps())
                        .map(|(weight, reps)| Performance {
                            weight,
                            reps,
                            date: log.date,
                        });
                }
            }
        }

        tracing::debug!(
            "Indexed {} logs covering {} exercises",
            logs.len(),
            exercises.len()
        );

        Self { logs, exercises }
    }

    pub fn logs(&self) -> &[WorkoutLog] {
        &self.logs
    }

    pub fn exercise(&self, name: &str) -> Option<&ExerciseHistory> {
        self.exercises.get(name)
    }

    /// Last weight × reps performed, used to pre-fill set inputs
    pub fn last_performance(&self, name: &str) -> Option<Performance> {
        self.exercise(name).and_then(|h| h.last_performance)
    }

    /// Up to `limit` most recent sessions' final set with session volume
    pub fn recent_performances(&self, name: &str, limit: usize) -> Vec<RecentPerformance> {
        self.logs
            .iter()
            .filter_map(|log| {
                let exercise = log.exercise(name)?;
                let (weight, reps) = exercise.sets.last()?.weight_reps()?;
                Some(RecentPerformance {
                    date: log.date,
                    weight,
                    reps,
                    sets: exercise.sets.len(),
                    volume: weight * f64::from(reps) * exercise.sets.len() as f64,
                })
            })
            .take(limit)
            .collect()
    }
}

/// Load every log from the WAL and the CSV archive
///
/// Returns logs sorted by date (newest first), de-duplicated by id so a log
/// present in both places is counted once.
pub fn load_history(wal_path: &Path, csv_path: &Path) -> Result<Vec<WorkoutLog>> {
    let mut logs = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for log in crate::wal::read_logs(wal_path)? {
            if seen_ids.insert(log.id) {
                logs.push(log);
            }
        }
        tracing::debug!("Loaded {} logs from WAL", logs.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for log in crate::rollup::read_archived_logs(csv_path)? {
            if seen_ids.insert(log.id) {
                logs.push(log);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} logs from CSV", csv_count);
    }

    logs.sort_by(|a, b| b.date.cmp(&a.date));
    tracing::info!("Loaded {} workout logs", logs.len());

    Ok(logs)
}
