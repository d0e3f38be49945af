//! Core domain types for the Lift session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout templates as stored by the template collaborator
//! - Exercise slots and set records materialized for one session
//! - The session phase
//! - Completion records handed to persistence
//! - Per-user exercise defaults

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Template Types
// ============================================================================

/// One exercise's association with a workout template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    /// Id of the template-exercise association, carried into log entries
    pub workout_exercise_id: String,
    pub exercise_id: String,
    pub name: String,
    pub order_index: u32,
    pub target_sets: u32,
    pub target_reps: u32,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    /// Starting weight hint used when the user has no default or history
    #[serde(default)]
    pub suggested_weight: Option<f64>,
}

/// A stored workout template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    pub exercises: Vec<TemplateExercise>,
}

/// Which plan a session should run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkoutRef {
    /// The built-in demo plan; sessions from it are logged as ad hoc
    Demo,
    Id(String),
}

impl WorkoutRef {
    /// Workout id as it appears on the completion record
    pub fn workout_id(&self) -> Option<&str> {
        match self {
            WorkoutRef::Demo => None,
            WorkoutRef::Id(id) => Some(id),
        }
    }
}

impl From<Option<String>> for WorkoutRef {
    fn from(id: Option<String>) -> Self {
        match id {
            Some(id) => WorkoutRef::Id(id),
            None => WorkoutRef::Demo,
        }
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// One planned or performed set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    /// `"<slot>-<set>"`, for display keying only
    pub id: String,
    pub completed: bool,
    pub weight: f64,
    pub reps: u32,
}

/// One exercise's place in a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSlot {
    pub exercise_id: String,
    pub workout_exercise_id: String,
    pub name: String,
    pub target_sets: u32,
    pub target_reps: u32,
    pub rest_seconds: u32,
    pub sets: Vec<SetRecord>,
}

impl ExerciseSlot {
    /// Index of the next set to perform, if any remain
    pub fn next_incomplete(&self) -> Option<usize> {
        self.sets.iter().position(|s| !s.completed)
    }

    pub fn is_complete(&self) -> bool {
        self.next_incomplete().is_none()
    }

    pub fn completed_count(&self) -> usize {
        self.sets.iter().filter(|s| s.completed).count()
    }
}

/// A resolved plan ready to be executed
#[derive(Clone, Debug)]
pub struct SessionPlan {
    pub user_id: String,
    pub workout_id: Option<String>,
    pub workout_name: String,
    pub slots: Vec<ExerciseSlot>,
}

/// Session phase
///
/// Rest remaining only exists while resting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Working,
    Resting { remaining: u32 },
    Finished,
}

impl Phase {
    pub fn is_resting(&self) -> bool {
        matches!(self, Phase::Resting { .. })
    }

    pub fn rest_remaining(&self) -> Option<u32> {
        match self {
            Phase::Resting { remaining } => Some(*remaining),
            Phase::Working | Phase::Finished => None,
        }
    }
}

// ============================================================================
// Completion Types
// ============================================================================

/// Status of a logged workout
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutStatus {
    Completed,
}

/// One performed set in a completion record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetLogEntry {
    pub exercise_id: String,
    pub workout_exercise_id: String,
    /// 1-based
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
}

/// Summary of a finished session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub workout_id: Option<String>,
    pub workout_name: String,
    pub status: WorkoutStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub entries: Vec<SetLogEntry>,
}

// ============================================================================
// User Defaults
// ============================================================================

/// A user's preferred starting values for one exercise
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ExerciseDefaults {
    #[serde(default)]
    pub default_weight_kg: Option<f64>,
    #[serde(default)]
    pub default_reps: Option<u32>,
}

/// Exercise defaults for every user, keyed by user id then exercise id
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserDefaultsState {
    pub users: HashMap<String, HashMap<String, ExerciseDefaults>>,
}

impl UserDefaultsState {
    pub fn get(&self, user_id: &str, exercise_id: &str) -> Option<&ExerciseDefaults> {
        self.users.get(user_id)?.get(exercise_id)
    }

    /// Insert or replace a user's defaults for an exercise
    pub fn set(&mut self, user_id: &str, exercise_id: &str, defaults: ExerciseDefaults) {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .insert(exercise_id.to_string(), defaults);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_with(completed: &[bool]) -> ExerciseSlot {
        ExerciseSlot {
            exercise_id: "squat".into(),
            workout_exercise_id: "we-1".into(),
            name: "Squat".into(),
            target_sets: completed.len() as u32,
            target_reps: 5,
            rest_seconds: 90,
            sets: completed
                .iter()
                .enumerate()
                .map(|(i, done)| SetRecord {
                    id: format!("0-{}", i),
                    completed: *done,
                    weight: 100.0,
                    reps: 5,
                })
                .collect(),
        }
    }

    #[test]
    fn test_next_incomplete() {
        assert_eq!(slot_with(&[false, false]).next_incomplete(), Some(0));
        assert_eq!(slot_with(&[true, false]).next_incomplete(), Some(1));
        assert_eq!(slot_with(&[true, true]).next_incomplete(), None);
        assert!(slot_with(&[true, true]).is_complete());
        assert_eq!(slot_with(&[true, false, false]).completed_count(), 1);
    }

    #[test]
    fn test_phase_rest_remaining() {
        assert_eq!(Phase::Resting { remaining: 12 }.rest_remaining(), Some(12));
        assert_eq!(Phase::Working.rest_remaining(), None);
        assert!(!Phase::Finished.is_resting());
    }

    #[test]
    fn test_workout_ref_from_option() {
        assert_eq!(WorkoutRef::from(None), WorkoutRef::Demo);
        assert_eq!(
            WorkoutRef::from(Some("w1".to_string())).workout_id(),
            Some("w1")
        );
        assert_eq!(WorkoutRef::Demo.workout_id(), None);
    }

    #[test]
    fn test_user_defaults_set_and_get() {
        let mut state = UserDefaultsState::default();
        state.set(
            "u1",
            "squat",
            ExerciseDefaults {
                default_weight_kg: Some(80.0),
                default_reps: None,
            },
        );

        assert_eq!(
            state.get("u1", "squat").and_then(|d| d.default_weight_kg),
            Some(80.0)
        );
        assert!(state.get("u2", "squat").is_none());
    }
}
