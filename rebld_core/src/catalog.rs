//! Built-in quick-start routines.
//!
//! Quick starts let a workout begin without a plan. Each routine is a plain
//! exercise list and goes through the normalizer like any other day.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// A named routine that can be started directly
#[derive(Clone, Debug, PartialEq)]
pub struct QuickStartRoutine {
    pub id: String,
    pub name: String,
    pub day: ExerciseListDay,
}

impl QuickStartRoutine {
    pub fn to_day(&self) -> DayDescription {
        DayDescription::ExerciseList(self.day.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct QuickStartCatalog {
    pub routines: BTreeMap<String, QuickStartRoutine>,
}

/// Cached default catalog, built once on first use
static DEFAULT_CATALOG: Lazy<QuickStartCatalog> = Lazy::new(build_default_catalog);

pub fn get_default_catalog() -> &'static QuickStartCatalog {
    &DEFAULT_CATALOG
}

fn strength(name: &str, sets: u32, reps: &str, rest_s: u32) -> Exercise {
    Exercise {
        name: name.into(),
        metrics: MetricsTemplate::SetsRepsWeight {
            target_sets: Some(sets),
            target_reps: Some(reps.into()),
            rest_period_s: Some(rest_s),
            one_rep_max_percentage: None,
        },
        rpe: None,
        notes: None,
    }
}

fn timed(name: &str, sets: u32, duration_s: u32, rest_s: u32) -> Exercise {
    Exercise {
        name: name.into(),
        metrics: MetricsTemplate::SetsDuration {
            target_sets: Some(sets),
            target_duration_s: Some(duration_s),
            rest_period_s: Some(rest_s),
        },
        rpe: None,
        notes: None,
    }
}

fn routine(id: &str, name: &str, notes: &str, exercises: Vec<Exercise>) -> QuickStartRoutine {
    QuickStartRoutine {
        id: id.into(),
        name: name.into(),
        day: ExerciseListDay {
            focus: name.into(),
            notes: Some(notes.into()),
            exercises,
        },
    }
}

fn build_default_catalog() -> QuickStartCatalog {
    let routines = [
        routine(
            "full_body_express",
            "Full Body Express",
            "Three big lifts, moderate load",
            vec![
                strength("Goblet Squat", 3, "10", 60),
                strength("Dumbbell Bench Press", 3, "8-10", 60),
                strength("One-Arm Dumbbell Row", 3, "10", 60),
            ],
        ),
        routine(
            "upper_push_pull",
            "Upper Push & Pull",
            "Alternate pressing and pulling",
            vec![
                strength("Overhead Press", 4, "6-8", 90),
                strength("Lat Pulldown", 4, "8-12", 90),
                strength("Face Pull", 3, "15", 45),
            ],
        ),
        routine(
            "core_finisher",
            "Core Finisher",
            "Short trunk circuit",
            vec![
                timed("Plank", 3, 45, 30),
                timed("Side Plank", 2, 30, 30),
                timed("Hollow Hold", 2, 20, 30),
            ],
        ),
        routine(
            "mobility_reset",
            "Mobility Reset",
            "Easy flow, no rest needed",
            vec![
                timed("Cat Cow", 1, 60, 0),
                timed("World's Greatest Stretch", 1, 90, 0),
                timed("Hip Mobility Flow", 1, 120, 0),
            ],
        ),
    ];

    QuickStartCatalog {
        routines: routines
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect(),
    }
}

impl QuickStartCatalog {
    /// Look up a routine by id
    pub fn routine(&self, id: &str) -> Result<&QuickStartRoutine> {
        self.routines
            .get(id)
            .ok_or_else(|| Error::UnknownRoutine(id.to_string()))
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, routine) in &self.routines {
            if id.is_empty() || routine.id.is_empty() {
                errors.push("Routine has empty ID".to_string());
            }
            if id != &routine.id {
                errors.push(format!(
                    "Routine key '{}' doesn't match routine.id '{}'",
                    id, routine.id
                ));
            }
            if routine.name.is_empty() {
                errors.push(format!("Routine '{}' has empty name", id));
            }
            if routine.day.exercises.is_empty() {
                errors.push(format!("Routine '{}' has no exercises", id));
            }
            for exercise in &routine.day.exercises {
                if exercise.name.trim().is_empty() {
                    errors.push(format!("Routine '{}' has an unnamed exercise", id));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn test_default_catalog_validates() {
        let errors = get_default_catalog().validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_every_routine_normalizes() {
        for routine in get_default_catalog().routines.values() {
            let session = normalize(&routine.to_day()).unwrap();
            assert_eq!(session.blocks.len(), 1);
            assert_eq!(session.focus, routine.name);
            assert_eq!(session.exercise_count(), routine.day.exercises.len());
        }
    }

    #[test]
    fn test_unknown_routine() {
        let catalog = get_default_catalog();
        assert!(catalog.routine("full_body_express").is_ok());
        assert!(matches!(
            catalog.routine("leg_day_9000"),
            Err(Error::UnknownRoutine(id)) if id == "leg_day_9000"
        ));
    }

    #[test]
    fn test_catalog_is_cached() {
        assert!(std::ptr::eq(get_default_catalog(), get_default_catalog()));
    }
}
