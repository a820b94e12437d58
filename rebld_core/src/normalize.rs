//! Conversion of day descriptions into the canonical session shape.
//!
//! Normalization is pure and deterministic. Whatever the input shape, the
//! result has at least one block, every block has at least one exercise,
//! supersets run at least one round and AMRAP windows are at least a minute.

use crate::{
    Block, BlockKind, DayDescription, Error, ExerciseListDay, Result, Session, TimeOfDay,
    TimedSession,
};

/// Normalize any supported day description into a canonical [`Session`].
///
/// Fails only when nothing performable is left after sanitising.
pub fn normalize(day: &DayDescription) -> Result<Session> {
    let session = match day {
        DayDescription::ExerciseList(day) => from_exercise_list(day),
        DayDescription::TimedSession(timed) => from_timed_session(timed),
        DayDescription::Canonical(session) => session.clone(),
    };

    let session = sanitize(session);
    if session.blocks.is_empty() {
        return Err(Error::EmptySession(session.focus));
    }

    tracing::debug!(
        "Normalized '{}' into {} blocks / {} exercises",
        session.focus,
        session.blocks.len(),
        session.exercise_count()
    );
    Ok(session)
}

fn from_exercise_list(day: &ExerciseListDay) -> Session {
    Session {
        focus: day.focus.clone(),
        notes: day.notes.clone(),
        blocks: vec![Block {
            kind: BlockKind::Single,
            title: Some(day.focus.clone()),
            notes: None,
            exercises: day.exercises.clone(),
        }],
    }
}

fn from_timed_session(timed: &TimedSession) -> Session {
    let focus = timed
        .session_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_focus(timed.time_of_day).to_string());

    let notes = match timed.time_of_day {
        Some(TimeOfDay::Morning) => Some("Morning session".to_string()),
        Some(TimeOfDay::Evening) => Some("Evening session".to_string()),
        Some(TimeOfDay::AllDay) | None => None,
    };

    Session {
        focus,
        notes,
        blocks: timed.blocks.clone(),
    }
}

fn default_focus(time_of_day: Option<TimeOfDay>) -> &'static str {
    match time_of_day {
        Some(TimeOfDay::Morning) => "Morning Session",
        Some(TimeOfDay::Evening) => "Evening Session",
        Some(TimeOfDay::AllDay) | None => "Training Session",
    }
}

/// Drop empty blocks and clamp block parameters into their valid ranges.
///
/// Identity on sessions that already satisfy the invariants.
fn sanitize(mut session: Session) -> Session {
    let before = session.blocks.len();
    session.blocks.retain(|block| !block.exercises.is_empty());
    if session.blocks.len() < before {
        tracing::warn!(
            "Dropped {} empty blocks from '{}'",
            before - session.blocks.len(),
            session.focus
        );
    }

    for block in &mut session.blocks {
        match &mut block.kind {
            BlockKind::Superset { rounds } if *rounds == 0 => {
                tracing::warn!(
                    "Superset '{}' has no rounds, running 1",
                    block.title.as_deref().unwrap_or("untitled")
                );
                *rounds = 1;
            }
            BlockKind::Amrap { duration_minutes } if *duration_minutes == 0 => {
                tracing::warn!(
                    "AMRAP '{}' has no duration, running 1 minute",
                    block.title.as_deref().unwrap_or("untitled")
                );
                *duration_minutes = 1;
            }
            _ => {}
        }
    }

    session
}
