//! Error types for the lift_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested workout does not exist in the template store
    #[error("Workout not found: {0}")]
    WorkoutNotFound(String),

    /// The workout plan could not be resolved
    #[error("Failed to load workout: {0}")]
    LoadFailure(String),

    /// The resolved plan has no exercises
    #[error("Workout {0} has no exercises")]
    EmptyPlan(String),

    /// Template validation error
    #[error("Template validation error: {0}")]
    TemplateValidation(String),

    /// State management error
    #[error("State error: {0}")]
    State(String),

    /// Completion record could not be saved
    #[error("Failed to save workout: {0}")]
    Persistence(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that mean the session never started.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Error::WorkoutNotFound(_)
                | Error::LoadFailure(_)
                | Error::EmptyPlan(_)
                | Error::TemplateValidation(_)
        )
    }
}
