#![forbid(unsafe_code)]

//! Core domain model and session engine for Rebld.
//!
//! This crate provides:
//! - Domain types (metrics templates, blocks, sessions, workout logs)
//! - Normalization of day descriptions into canonical sessions
//! - The session progression controller, rest countdown and frame ticker
//! - PR detection against exercise history
//! - Persistence (WAL, CSV archive) and the quick-start catalog

pub mod types;
pub mod error;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod controller;
pub mod finalize;
pub mod history;
pub mod logging;
pub mod normalize;
pub mod records;
pub mod rollup;
pub mod ticker;
pub mod timer;
pub mod wal;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::get_default_catalog;
pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock};
pub use config::{Config, SessionSettings};
pub use controller::{Rejection, SessionController, SessionEvent, SessionState, SetInput};
pub use finalize::FinishedSession;
pub use history::{load_history, HistoryIndex};
pub use normalize::normalize;
pub use records::{detect_pr, PrNotification};
pub use wal::{JsonlSink, LogSink};
