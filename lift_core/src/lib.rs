#![forbid(unsafe_code)]

//! Core domain model and session engine for Lift.
//!
//! This crate provides:
//! - Domain types (templates, slots, set records, completion records)
//! - Session plan loading with starting weight resolution
//! - The set progression state machine and its clocks
//! - Completion recording
//! - File-backed stores (templates, user defaults, WAL, CSV archive)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod wal;
pub mod csv_rollup;
pub mod defaults;
pub mod history;
pub mod loader;
pub mod timer;
pub mod session;
pub mod recorder;
pub mod runner;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{demo_workout, TemplateStore};
pub use config::Config;
pub use wal::{CompletionSink, JsonlSink};
pub use history::SessionHistory;
pub use loader::{ExerciseDefaultsSource, PerformanceHistory, PlanLoader, PlanSource};
pub use timer::{format_clock, Clock, SystemClock};
pub use session::{Outcome, SessionEvent, SessionView, SetField, WorkoutSession};
pub use recorder::Delivery;
pub use runner::{SessionEnd, SessionMessage, SessionRunner, Ticking};
