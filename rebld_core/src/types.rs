//! Core domain types for workout session execution.
//!
//! This module defines:
//! - Metrics templates (the target load shape of an exercise)
//! - Exercises, blocks and the canonical session
//! - The day descriptions a session can be built from
//! - Logged sets, logged exercises and the finished workout log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Metrics Templates
// ============================================================================

/// Target load shape of an exercise.
///
/// Every target field is optional because plans are frequently produced by
/// tools that omit them; the accessors below supply the defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricsTemplate {
    SetsRepsWeight {
        target_sets: Option<u32>,
        target_reps: Option<String>,
        rest_period_s: Option<u32>,
        one_rep_max_percentage: Option<String>,
    },
    SetsRepsWeightTempo {
        target_sets: Option<u32>,
        target_reps: Option<String>,
        rest_period_s: Option<u32>,
        target_tempo: String,
    },
    SetsDuration {
        target_sets: Option<u32>,
        target_duration_s: Option<u32>,
        rest_period_s: Option<u32>,
    },
    SetsDistanceRest {
        target_sets: Option<u32>,
        target_distance_m: Option<f64>,
        target_rest_s: Option<u32>,
        rest_period_s: Option<u32>,
    },
    DistanceTime {
        target_distance_km: Option<f64>,
        target_distance_m: Option<f64>,
        rest_period_s: Option<u32>,
    },
    DurationOnly {
        target_duration_minutes: Option<u32>,
        target_duration_s: Option<u32>,
    },
}

/// What a user enters when completing a set of an exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    WeightReps,
    Duration,
}

impl MetricsTemplate {
    /// Target number of sets; missing or zero degrades to a single set.
    pub fn target_sets(&self) -> u32 {
        let sets = match self {
            MetricsTemplate::SetsRepsWeight { target_sets, .. }
            | MetricsTemplate::SetsRepsWeightTempo { target_sets, .. }
            | MetricsTemplate::SetsDuration { target_sets, .. }
            | MetricsTemplate::SetsDistanceRest { target_sets, .. } => *target_sets,
            MetricsTemplate::DistanceTime { .. } | MetricsTemplate::DurationOnly { .. } => None,
        };
        sets.filter(|s| *s > 0).unwrap_or(1)
    }

    /// Rest after a set in seconds (0 means no rest)
    pub fn rest_period_s(&self) -> u32 {
        match self {
            MetricsTemplate::SetsRepsWeight { rest_period_s, .. }
            | MetricsTemplate::SetsRepsWeightTempo { rest_period_s, .. }
            | MetricsTemplate::SetsDuration { rest_period_s, .. }
            | MetricsTemplate::DistanceTime { rest_period_s, .. } => rest_period_s.unwrap_or(0),
            MetricsTemplate::SetsDistanceRest {
                rest_period_s,
                target_rest_s,
                ..
            } => rest_period_s.or(*target_rest_s).unwrap_or(0),
            MetricsTemplate::DurationOnly { .. } => 0,
        }
    }

    pub fn input_kind(&self) -> InputKind {
        match self {
            MetricsTemplate::SetsRepsWeight { .. } | MetricsTemplate::SetsRepsWeightTempo { .. } => {
                InputKind::WeightReps
            }
            MetricsTemplate::SetsDuration { .. }
            | MetricsTemplate::SetsDistanceRest { .. }
            | MetricsTemplate::DistanceTime { .. }
            | MetricsTemplate::DurationOnly { .. } => InputKind::Duration,
        }
    }

    /// Lower bound of the rep target ("8-10" → 8), if one can be read.
    pub fn target_reps_floor(&self) -> Option<u32> {
        let reps = match self {
            MetricsTemplate::SetsRepsWeight { target_reps, .. }
            | MetricsTemplate::SetsRepsWeightTempo { target_reps, .. } => target_reps.as_deref()?,
            _ => return None,
        };
        let digits: String = reps
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok().filter(|r| *r > 0)
    }

    /// Target duration in seconds for timed templates
    pub fn target_duration_s(&self) -> Option<u32> {
        match self {
            MetricsTemplate::SetsDuration {
                target_duration_s, ..
            } => *target_duration_s,
            MetricsTemplate::DurationOnly {
                target_duration_minutes,
                target_duration_s,
            } => target_duration_s.or(target_duration_minutes.map(|m| m * 60)),
            _ => None,
        }
    }
}

// ============================================================================
// Exercises, Blocks, Sessions
// ============================================================================

/// A planned exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    #[serde(rename = "exercise_name")]
    pub name: String,
    #[serde(rename = "metrics_template")]
    pub metrics: MetricsTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Execution protocol of a block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Single,
    Superset {
        #[serde(default)]
        rounds: u32,
    },
    Amrap {
        #[serde(default)]
        duration_minutes: u32,
    },
}

/// A group of exercises sharing one execution protocol
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Block {
    /// Number of set rounds the block runs for.
    ///
    /// Supersets use their round count; single blocks use the largest target
    /// among their exercises. AMRAP blocks are time-bound and report 1.
    pub fn total_sets(&self) -> u32 {
        match &self.kind {
            BlockKind::Superset { rounds } => (*rounds).max(1),
            BlockKind::Single => self
                .exercises
                .iter()
                .map(|e| e.metrics.target_sets())
                .max()
                .unwrap_or(1),
            BlockKind::Amrap { .. } => 1,
        }
    }

    /// Rest period of the trailing exercise, which governs rest between rounds
    pub fn rest_period_s(&self) -> u32 {
        self.exercises
            .last()
            .map(|e| e.metrics.rest_period_s())
            .unwrap_or(0)
    }

    pub fn is_amrap(&self) -> bool {
        matches!(self.kind, BlockKind::Amrap { .. })
    }

    /// Title for display, falling back to the first exercise name
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or_else(|| self.exercises.first().map(|e| e.name.as_str()))
            .unwrap_or("Block")
    }
}

/// The canonical session every day description is normalized into
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub focus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub blocks: Vec<Block>,
}

impl Session {
    pub fn exercise_count(&self) -> usize {
        self.blocks.iter().map(|b| b.exercises.len()).sum()
    }
}

// ============================================================================
// Day Descriptions (normalizer input)
// ============================================================================

/// A plan day listing exercises without grouping them into blocks
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseListDay {
    pub focus: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// When a sub-session of a two-a-day plan is meant to be trained
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOfDay {
    Morning,
    Evening,
    AllDay,
}

/// One sub-session of a day split into morning/evening training
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimedSession {
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Any of the shapes a workout can be started from
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayDescription {
    ExerciseList(ExerciseListDay),
    TimedSession(TimedSession),
    Canonical(Session),
}

// ============================================================================
// Logged Data
// ============================================================================

/// A completed set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LoggedSet {
    Srw {
        set: u32,
        weight: f64,
        reps: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rpe: Option<f32>,
    },
    Duration {
        set: u32,
        duration_s: u32,
    },
}

impl LoggedSet {
    pub fn set_number(&self) -> u32 {
        match self {
            LoggedSet::Srw { set, .. } | LoggedSet::Duration { set, .. } => *set,
        }
    }

    pub fn weight_reps(&self) -> Option<(f64, u32)> {
        match self {
            LoggedSet::Srw { weight, reps, .. } => Some((*weight, *reps)),
            LoggedSet::Duration { .. } => None,
        }
    }
}

/// All sets logged for one exercise in a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedExercise {
    #[serde(rename = "exercise_name")]
    pub name: String,
    pub sets: Vec<LoggedSet>,
}

/// The persisted record of a finished workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutLog {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub focus: String,
    pub exercises: Vec<LoggedExercise>,
    #[serde(rename = "durationMinutes", default)]
    pub duration_minutes: u32,
}

impl WorkoutLog {
    pub fn exercise(&self, name: &str) -> Option<&LoggedExercise> {
        self.exercises.iter().find(|e| e.name == name)
    }
}
