//! Write-Ahead Log (WAL) for finished workout logs.
//!
//! Logs are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access. The sink is append-only: it is never
//! asked to update or delete a log.

use crate::{Result, WorkoutLog};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for finished workout logs
pub trait LogSink {
    fn append(&mut self, log: &WorkoutLog) -> Result<()>;
}

/// JSONL-based log sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LogSink for JsonlSink {
    fn append(&mut self, log: &WorkoutLog) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One log per line
        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(log)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended workout log {} to WAL", log.id);
        Ok(())
    }
}

/// Read all logs from a WAL file, skipping lines that fail to parse
pub fn read_logs(path: &Path) -> Result<Vec<WorkoutLog>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut logs = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WorkoutLog>(&line) {
            Ok(log) => logs.push(log),
            Err(e) => {
                tracing::warn!("Failed to parse workout log at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} logs from WAL", logs.len());
    Ok(logs)
}
