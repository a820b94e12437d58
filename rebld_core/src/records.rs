//! Personal record detection.

use crate::history::{ExerciseHistory, Performance};
use crate::WorkoutLog;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Movements where load is not the point; no PRs are raised for them
const UNTRACKED_KEYWORDS: &[&str] = &[
    "stretch",
    "mobility",
    "plank",
    "bird dog",
    "dead bug",
    "thread the needle",
    "cat cow",
    "foam roll",
    "cardio",
    "walk",
    "jog",
    "run",
    "elliptical",
    "bike",
    "breath",
    "hang",
    "hollow hold",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrKind {
    /// Heavier than anything lifted before
    HeaviestLift,
    /// Same top weight, more reps
    RepRecord,
}

/// Raised when a logged set beats the exercise history
#[derive(Clone, Debug, PartialEq)]
pub struct PrNotification {
    pub exercise_name: String,
    pub weight: f64,
    pub reps: u32,
    pub kind: PrKind,
    pub previous_best: Option<Performance>,
}

impl fmt::Display for PrNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            PrKind::HeaviestLift => "new heaviest lift",
            PrKind::RepRecord => "new rep record at that weight",
        };
        write!(
            f,
            "NEW PR! {} - {} kg × {} ({})",
            self.exercise_name, self.weight, self.reps, what
        )
    }
}

/// Compare a set against the exercise history.
///
/// Pure and safe on partial input: zero or non-finite weight and zero reps
/// never count.
pub fn detect_pr(
    exercise_name: &str,
    weight: f64,
    reps: u32,
    history: &ExerciseHistory,
) -> Option<PrNotification> {
    if !weight.is_finite() || weight <= 0.0 || reps == 0 {
        return None;
    }

    let kind = if weight > history.best_weight {
        PrKind::HeaviestLift
    } else if weight == history.best_weight && reps > history.reps_at_best_weight {
        PrKind::RepRecord
    } else {
        return None;
    };

    Some(PrNotification {
        exercise_name: exercise_name.to_string(),
        weight,
        reps,
        kind,
        previous_best: history.best(),
    })
}

/// Whether PRs make sense for this exercise
pub fn should_track_pr(exercise_name: &str) -> bool {
    let name = exercise_name.to_lowercase();
    !UNTRACKED_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

/// Current record of an exercise across all logs
#[derive(Clone, Debug, PartialEq)]
pub struct PersonalRecord {
    pub exercise_name: String,
    pub weight: f64,
    pub reps: u32,
    pub date: DateTime<Utc>,
    pub previous_best: Option<Performance>,
}

/// Replay the logs oldest-first and report each exercise's standing record.
///
/// Sorted by exercise name.
pub fn personal_records(logs: &[WorkoutLog]) -> Vec<PersonalRecord> {
    let mut ordered: Vec<&WorkoutLog> = logs.iter().collect();
    ordered.sort_by_key(|log| log.date);

    let mut records: BTreeMap<&str, PersonalRecord> = BTreeMap::new();
    for log in ordered {
        for exercise in &log.exercises {
            for (weight, reps) in exercise.sets.iter().filter_map(|s| s.weight_reps()) {
                match records.get_mut(exercise.name.as_str()) {
                    None => {
                        records.insert(
                            &exercise.name,
                            PersonalRecord {
                                exercise_name: exercise.name.clone(),
                                weight,
                                reps,
                                date: log.date,
                                previous_best: None,
                            },
                        );
                    }
                    Some(record)
                        if weight > record.weight
                            || (weight == record.weight && reps > record.reps) =>
                    {
                        record.previous_best = Some(Performance {
                            weight: record.weight,
                            reps: record.reps,
                            date: record.date,
                        });
                        record.weight = weight;
                        record.reps = reps;
                        record.date = log.date;
                    }
                    Some(_) => {}
                }
            }
        }
    }

    records.into_values().collect()
}
