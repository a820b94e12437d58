//! CSV archive of workout logs.
//!
//! The WAL is periodically rolled up into a flat CSV file with one row per
//! logged set. Reading the archive regroups rows by log id.

use crate::{LoggedExercise, LoggedSet, Result, WorkoutLog};
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// One row of the archive.
///
/// A log without any sets still gets a single row with the exercise
/// columns left empty, so its focus and duration survive the rollup.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CsvRow {
    log_id: String,
    date: String,
    focus: String,
    duration_minutes: u32,
    exercise_name: Option<String>,
    set: Option<u32>,
    weight: Option<f64>,
    reps: Option<u32>,
    rpe: Option<f32>,
    duration_s: Option<u32>,
}

impl CsvRow {
    fn header_only(log: &WorkoutLog) -> Self {
        CsvRow {
            log_id: log.id.to_string(),
            date: log.date.to_rfc3339(),
            focus: log.focus.clone(),
            duration_minutes: log.duration_minutes,
            exercise_name: None,
            set: None,
            weight: None,
            reps: None,
            rpe: None,
            duration_s: None,
        }
    }

    fn for_set(log: &WorkoutLog, exercise: &str, set: &LoggedSet) -> Self {
        let mut row = Self::header_only(log);
        row.exercise_name = Some(exercise.to_string());
        row.set = Some(set.set_number());
        match set {
            LoggedSet::Srw {
                weight, reps, rpe, ..
            } => {
                row.weight = Some(*weight);
                row.reps = Some(*reps);
                row.rpe = *rpe;
            }
            LoggedSet::Duration { duration_s, .. } => row.duration_s = Some(*duration_s),
        }
        row
    }

    fn logged_set(&self) -> Option<LoggedSet> {
        let set = self.set?;
        match (self.weight, self.reps, self.duration_s) {
            (Some(weight), Some(reps), _) => Some(LoggedSet::Srw {
                set,
                weight,
                reps,
                rpe: self.rpe,
            }),
            (_, _, Some(duration_s)) => Some(LoggedSet::Duration { set, duration_s }),
            _ => None,
        }
    }
}

fn rows_for(log: &WorkoutLog) -> Vec<CsvRow> {
    let rows: Vec<CsvRow> = log
        .exercises
        .iter()
        .flat_map(|exercise| {
            exercise
                .sets
                .iter()
                .map(move |set| CsvRow::for_set(log, &exercise.name, set))
        })
        .collect();

    if rows.is_empty() {
        vec![CsvRow::header_only(log)]
    } else {
        rows
    }
}

/// Roll up WAL logs into the CSV archive and retire the WAL
///
/// This function:
/// 1. Reads all logs from the WAL
/// 2. Appends their rows to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .wal.processed
/// 5. Returns the number of logs archived
pub fn rollup_to_csv(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let logs = crate::wal::read_logs(wal_path)?;

    if logs.is_empty() {
        tracing::info!("No logs in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a fresh file gets a header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for log in &logs {
        for row in rows_for(log) {
            writer.serialize(row)?;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Archived {} workout logs to CSV", logs.len());

    // CSV is durable; now retire the WAL without deleting it
    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(logs.len())
}

/// Read the archive back into logs, in first-seen order
///
/// Rows that cannot be parsed are skipped with a warning.
pub fn read_archived_logs(csv_path: &Path) -> Result<Vec<WorkoutLog>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)?;

    let mut logs: Vec<WorkoutLog> = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
                continue;
            }
        };

        let (id, date) = match parse_identity(&row) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("Failed to parse CSV row: {}", e);
                continue;
            }
        };

        // Rows of one log are written contiguously
        if logs.last().map(|log| log.id) != Some(id) {
            logs.push(WorkoutLog {
                id,
                date,
                focus: row.focus.clone(),
                exercises: Vec::new(),
                duration_minutes: row.duration_minutes,
            });
        }
        let Some(log) = logs.last_mut() else {
            continue;
        };

        let (Some(name), Some(set)) = (row.exercise_name.as_ref(), row.logged_set()) else {
            continue;
        };
        match log.exercises.iter_mut().find(|e| &e.name == name) {
            Some(exercise) => exercise.sets.push(set),
            None => log.exercises.push(LoggedExercise {
                name: name.clone(),
                sets: vec![set],
            }),
        }
    }

    tracing::debug!("Read {} logs from CSV archive", logs.len());
    Ok(logs)
}

fn parse_identity(row: &CsvRow) -> Result<(Uuid, DateTime<Utc>)> {
    let id = Uuid::parse_str(&row.log_id)
        .map_err(|e| crate::Error::Other(format!("Invalid log id: {}", e)))?;
    let date = DateTime::parse_from_rfc3339(&row.date)
        .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
        .with_timezone(&Utc);
    Ok((id, date))
}

/// Remove retired `.wal.processed` files from a directory
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
