//! Workout templates: the built-in demo plan and the file-backed store.
//!
//! Templates live in `workouts.json` as a JSON array. Authoring them is
//! outside this crate; the store only resolves them for a session.

use crate::loader::PlanSource;
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Cached demo plan - built once and reused across sessions
static DEMO_WORKOUT: Lazy<WorkoutTemplate> = Lazy::new(build_demo_workout);

/// Get a reference to the cached demo plan
pub fn demo_workout() -> &'static WorkoutTemplate {
    &DEMO_WORKOUT
}

fn build_demo_workout() -> WorkoutTemplate {
    WorkoutTemplate {
        id: "demo".into(),
        name: "Leg Day (Demo)".into(),
        exercises: vec![
            TemplateExercise {
                workout_exercise_id: "demo-1".into(),
                exercise_id: "barbell_squat".into(),
                name: "Barbell Squats".into(),
                order_index: 0,
                target_sets: 4,
                target_reps: 8,
                rest_seconds: Some(60),
                suggested_weight: Some(100.0),
            },
            TemplateExercise {
                workout_exercise_id: "demo-2".into(),
                exercise_id: "lunge".into(),
                name: "Lunges".into(),
                order_index: 1,
                target_sets: 3,
                target_reps: 12,
                rest_seconds: Some(60),
                suggested_weight: Some(40.0),
            },
        ],
    }
}

/// Check a template for problems that would make a session unplayable
///
/// Returns one message per problem; empty means valid.
pub fn validate_template(template: &WorkoutTemplate) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen_links = HashSet::new();

    for exercise in &template.exercises {
        if exercise.target_sets == 0 {
            errors.push(format!(
                "Exercise '{}' in workout '{}' has no sets",
                exercise.name, template.id
            ));
        }

        if let Some(weight) = exercise.suggested_weight {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(format!(
                    "Exercise '{}' in workout '{}' has invalid suggested weight {}",
                    exercise.name, template.id, weight
                ));
            }
        }

        if !seen_links.insert(exercise.workout_exercise_id.as_str()) {
            errors.push(format!(
                "Duplicate workout_exercise_id '{}' in workout '{}'",
                exercise.workout_exercise_id, template.id
            ));
        }
    }

    errors
}

/// Workout templates backed by a JSON file
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every template in the store
    ///
    /// A missing file is an empty store.
    pub fn load_all(&self) -> Result<Vec<WorkoutTemplate>> {
        if !self.path.exists() {
            tracing::debug!("No template file at {:?}", self.path);
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let templates: Vec<WorkoutTemplate> = serde_json::from_str(&contents)?;
        tracing::debug!("Read {} templates from {:?}", templates.len(), self.path);
        Ok(templates)
    }

    /// Find one template by id
    pub fn find(&self, workout_id: &str) -> Result<WorkoutTemplate> {
        let templates = self
            .load_all()
            .map_err(|e| Error::LoadFailure(format!("{:?}: {}", self.path, e)))?;

        templates
            .into_iter()
            .find(|t| t.id == workout_id)
            .ok_or_else(|| Error::WorkoutNotFound(workout_id.to_string()))
    }
}

impl PlanSource for TemplateStore {
    fn resolve_workout_plan(
        &self,
        workout: &WorkoutRef,
        _user_id: &str,
    ) -> Result<WorkoutTemplate> {
        match workout {
            WorkoutRef::Demo => Ok(demo_workout().clone()),
            WorkoutRef::Id(id) => self.find(id),
        }
    }
}
