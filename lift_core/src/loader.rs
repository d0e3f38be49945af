//! Session plan loading.
//!
//! Turns a workout reference into exercise slots ready for execution:
//! - Resolve the template's ordered exercises
//! - Materialize one incomplete set record per target set
//! - Pick a starting weight and reps per exercise
//!
//! Starting weight precedence, per exercise:
//! 1. the user's configured default weight
//! 2. the weight the user last performed
//! 3. the template's suggested weight
//! 4. zero

use crate::catalog::validate_template;
use crate::{
    Error, ExerciseSlot, Result, SessionPlan, SetRecord, TemplateExercise, WorkoutRef,
    WorkoutTemplate,
};

/// Resolves workout templates
pub trait PlanSource {
    fn resolve_workout_plan(&self, workout: &WorkoutRef, user_id: &str)
        -> Result<WorkoutTemplate>;
}

/// Resolves a user's configured starting values for an exercise
pub trait ExerciseDefaultsSource {
    fn default_weight(&self, user_id: &str, exercise_id: &str) -> Result<Option<f64>>;
    fn default_reps(&self, user_id: &str, exercise_id: &str) -> Result<Option<u32>>;
}

/// Resolves what a user has lifted before
pub trait PerformanceHistory {
    fn last_performed_weight(&self, user_id: &str, exercise_id: &str) -> Result<Option<f64>>;
}

/// Collaborators the loader reads from
pub struct PlanLoader<'a> {
    plans: &'a dyn PlanSource,
    defaults: &'a dyn ExerciseDefaultsSource,
    history: &'a dyn PerformanceHistory,
    default_rest_seconds: u32,
}

impl<'a> PlanLoader<'a> {
    pub fn new(
        plans: &'a dyn PlanSource,
        defaults: &'a dyn ExerciseDefaultsSource,
        history: &'a dyn PerformanceHistory,
    ) -> Self {
        Self {
            plans,
            defaults,
            history,
            default_rest_seconds: 60,
        }
    }

    /// Rest used when a template exercise has none
    pub fn with_default_rest(mut self, seconds: u32) -> Self {
        self.default_rest_seconds = seconds;
        self
    }

    /// Resolve a plan for the user
    ///
    /// Fails with a load error if the workout cannot be resolved, is
    /// invalid, or has no exercises. Lookup failures for defaults and
    /// history are logged and treated as absent.
    pub fn load(&self, workout: &WorkoutRef, user_id: &str) -> Result<SessionPlan> {
        let template = self
            .plans
            .resolve_workout_plan(workout, user_id)
            .map_err(|e| match e {
                Error::WorkoutNotFound(_) | Error::LoadFailure(_) => e,
                other => Error::LoadFailure(other.to_string()),
            })?;

        let errors = validate_template(&template);
        if !errors.is_empty() {
            for error in &errors {
                tracing::warn!("{}", error);
            }
            return Err(Error::TemplateValidation(errors.join("; ")));
        }

        if template.exercises.is_empty() {
            return Err(Error::EmptyPlan(template.id));
        }

        let mut exercises: Vec<&TemplateExercise> = template.exercises.iter().collect();
        exercises.sort_by_key(|e| e.order_index);

        let slots: Vec<ExerciseSlot> = exercises
            .iter()
            .enumerate()
            .map(|(slot_idx, exercise)| self.build_slot(slot_idx, exercise, user_id))
            .collect();

        tracing::info!(
            "Loaded plan '{}' with {} exercises for user {}",
            template.name,
            slots.len(),
            user_id
        );

        Ok(SessionPlan {
            user_id: user_id.to_string(),
            workout_id: workout.workout_id().map(str::to_string),
            workout_name: template.name,
            slots,
        })
    }

    fn build_slot(&self, slot_idx: usize, exercise: &TemplateExercise, user_id: &str) -> ExerciseSlot {
        let weight = self.starting_weight(exercise, user_id);
        let reps = self
            .lookup("default reps", exercise, || {
                self.defaults.default_reps(user_id, &exercise.exercise_id)
            })
            .unwrap_or(exercise.target_reps);

        let sets = (0..exercise.target_sets)
            .map(|set_idx| SetRecord {
                id: format!("{}-{}", slot_idx, set_idx),
                completed: false,
                weight,
                reps,
            })
            .collect();

        ExerciseSlot {
            exercise_id: exercise.exercise_id.clone(),
            workout_exercise_id: exercise.workout_exercise_id.clone(),
            name: exercise.name.clone(),
            target_sets: exercise.target_sets,
            target_reps: exercise.target_reps,
            rest_seconds: exercise.rest_seconds.unwrap_or(self.default_rest_seconds),
            sets,
        }
    }

    fn starting_weight(&self, exercise: &TemplateExercise, user_id: &str) -> f64 {
        if let Some(weight) = self.lookup("default weight", exercise, || {
            self.defaults.default_weight(user_id, &exercise.exercise_id)
        }) {
            tracing::debug!("{}: using default weight {}", exercise.exercise_id, weight);
            return weight;
        }

        if let Some(weight) = self.lookup("last weight", exercise, || {
            self.history.last_performed_weight(user_id, &exercise.exercise_id)
        }) {
            tracing::debug!("{}: using last performed weight {}", exercise.exercise_id, weight);
            return weight;
        }

        exercise.suggested_weight.unwrap_or(0.0)
    }

    fn lookup<T>(
        &self,
        what: &str,
        exercise: &TemplateExercise,
        f: impl FnOnce() -> Result<Option<T>>,
    ) -> Option<T> {
        match f() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "Failed to look up {} for {}: {}. Ignoring.",
                    what,
                    exercise.exercise_id,
                    e
                );
                None
            }
        }
    }
}
