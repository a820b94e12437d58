//! Turning a finished session into its persisted workout log.

use crate::wal::LogSink;
use crate::{LoggedExercise, Result, WorkoutLog};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Whole minutes between start and finish, rounded; never negative.
pub fn duration_minutes(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> u32 {
    let millis = (finished_at - started_at).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let minutes = (millis as f64 / 60_000.0).round();
    if minutes >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        minutes as u32
    }
}

/// Build the log for a session.
///
/// Exercises keep the order they were first logged in; those with no sets
/// are left out.
pub fn finalize(
    focus: &str,
    exercises: Vec<LoggedExercise>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> WorkoutLog {
    WorkoutLog {
        id: Uuid::new_v4(),
        date: finished_at,
        focus: focus.to_string(),
        exercises: exercises
            .into_iter()
            .filter(|e| !e.sets.is_empty())
            .collect(),
        duration_minutes: duration_minutes(started_at, finished_at),
    }
}

/// A finalized log waiting to be handed to a sink.
///
/// Persisting borrows, so a failed attempt leaves the log in place and the
/// caller can simply try again.
#[derive(Clone, Debug, PartialEq)]
pub struct FinishedSession {
    log: WorkoutLog,
}

impl FinishedSession {
    pub fn new(log: WorkoutLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &WorkoutLog {
        &self.log
    }

    pub fn into_log(self) -> WorkoutLog {
        self.log
    }

    pub fn persist(&self, sink: &mut dyn LogSink) -> Result<()> {
        match sink.append(&self.log) {
            Ok(()) => {
                tracing::info!(
                    "Saved workout '{}' ({} exercises, {} min)",
                    self.log.focus,
                    self.log.exercises.len(),
                    self.log.duration_minutes
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to save workout '{}': {}", self.log.focus, e);
                Err(e)
            }
        }
    }
}
