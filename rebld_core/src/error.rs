//! Failures from loading plans, reading and writing workout logs, and config.
//!
//! Rejected session transitions are not errors; see `controller::Rejection`.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or appending a log, archive or plan file failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A plan file or WAL line is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The CSV archive could not be written or parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config parsed but holds unusable values
    #[error("Configuration error: {0}")]
    Config(String),

    /// A day description normalized to nothing runnable
    #[error("Session '{0}' has no exercises to perform")]
    EmptySession(String),

    #[error("Unknown quick-start routine: {0}")]
    UnknownRoutine(String),

    #[error("{0}")]
    Other(String),
}
