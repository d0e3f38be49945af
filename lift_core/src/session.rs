//! Set progression state machine.
//!
//! A `WorkoutSession` is the only owner of session state. Every change
//! goes through `handle`, one event at a time:
//!
//! ```text
//!            primary (not last set)             primary / rest expired
//! Working ───────────────────────────▶ Resting ───────────────────────▶ Working
//!    │
//!    │ primary (last set, more exercises) ──▶ Working on next exercise
//!    │
//!    └ primary (last set, last exercise) ───▶ Finished
//! ```
//!
//! Sets inside an exercise complete strictly in order. There is no forced
//! rest between exercises.

use crate::recorder;
use crate::timer::{ElapsedClock, RestTick, RestTimer};
use crate::{CompletionRecord, Error, ExerciseSlot, Phase, Result, SessionPlan};
use chrono::{DateTime, Utc};

/// Which field of the next set to edit
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SetField {
    Weight(f64),
    Reps(u32),
}

/// Everything that can change a session
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionEvent {
    /// Finish the current set, or skip the current rest
    PrimaryAction,
    RestTick,
    ElapsedTick,
    AdjustRest(i32),
    EditActiveSet(SetField),
    JumpToExercise(usize),
}

/// What an event did
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The event does not apply in the current state
    Ignored,
    ElapsedTicked {
        elapsed: u64,
    },
    RestTicked {
        remaining: u32,
    },
    /// A set was completed and rest began
    RestStarted {
        exercise_index: usize,
        set_index: usize,
        seconds: u32,
    },
    RestEnded {
        skipped: bool,
    },
    /// The last set of an exercise was completed and the next one is active
    ExerciseAdvanced {
        completed_index: usize,
        next_index: usize,
    },
    RestAdjusted {
        remaining: u32,
    },
    SetEdited {
        exercise_index: usize,
        set_index: usize,
    },
    Jumped {
        index: usize,
    },
    /// The last set of the last exercise was completed
    Finished(Box<CompletionRecord>),
}

/// State of one active workout
#[derive(Clone, Debug)]
pub struct WorkoutSession {
    user_id: String,
    workout_id: Option<String>,
    workout_name: String,
    slots: Vec<ExerciseSlot>,
    active_index: usize,
    phase: Phase,
    rest_baseline: u32,
    elapsed: ElapsedClock,
}

impl WorkoutSession {
    /// Begin a session in the Working phase on the first exercise
    ///
    /// Refuses a plan without exercises.
    pub fn start(plan: SessionPlan) -> Result<Self> {
        let rest_baseline = match plan.slots.first() {
            Some(slot) => slot.rest_seconds,
            None => {
                return Err(Error::EmptyPlan(
                    plan.workout_id.unwrap_or_else(|| plan.workout_name.clone()),
                ))
            }
        };

        if let Some(slot) = plan.slots.iter().find(|s| s.sets.is_empty()) {
            return Err(Error::TemplateValidation(format!(
                "Exercise '{}' has no sets",
                slot.name
            )));
        }

        tracing::info!(
            "Starting '{}' ({} exercises) for user {}",
            plan.workout_name,
            plan.slots.len(),
            plan.user_id
        );

        Ok(Self {
            user_id: plan.user_id,
            workout_id: plan.workout_id,
            workout_name: plan.workout_name,
            slots: plan.slots,
            active_index: 0,
            phase: Phase::Working,
            rest_baseline,
            elapsed: ElapsedClock::default(),
        })
    }

    /// Apply one event
    ///
    /// `now` is only used to stamp the completion record.
    pub fn handle(&mut self, event: SessionEvent, now: DateTime<Utc>) -> Outcome {
        let outcome = match event {
            SessionEvent::PrimaryAction => self.primary_action(now),
            SessionEvent::RestTick => self.rest_tick(),
            SessionEvent::ElapsedTick => self.elapsed_tick(),
            SessionEvent::AdjustRest(delta) => self.adjust_rest(delta),
            SessionEvent::EditActiveSet(field) => self.edit_active_set(field),
            SessionEvent::JumpToExercise(index) => self.jump_to_exercise(index),
        };

        match &outcome {
            Outcome::ElapsedTicked { .. } | Outcome::RestTicked { .. } => {}
            other => tracing::debug!("{:?} -> {:?}", event, other),
        }
        outcome
    }

    fn primary_action(&mut self, now: DateTime<Utc>) -> Outcome {
        match self.phase {
            Phase::Finished => Outcome::Ignored,
            Phase::Resting { .. } => {
                self.phase = Phase::Working;
                Outcome::RestEnded { skipped: true }
            }
            Phase::Working => self.complete_next_set(now),
        }
    }

    fn complete_next_set(&mut self, now: DateTime<Utc>) -> Outcome {
        let exercise_index = self.active_index;
        let slot = &mut self.slots[exercise_index];

        let Some(set_index) = slot.next_incomplete() else {
            // Reachable by jumping to a finished exercise
            return Outcome::Ignored;
        };

        slot.sets[set_index].completed = true;
        let is_last_set = set_index == slot.sets.len() - 1;
        let rest_seconds = slot.rest_seconds;

        if !is_last_set {
            self.rest_baseline = rest_seconds;
            self.phase = Phase::Resting {
                remaining: rest_seconds,
            };
            return Outcome::RestStarted {
                exercise_index,
                set_index,
                seconds: rest_seconds,
            };
        }

        if exercise_index + 1 < self.slots.len() {
            self.active_index = exercise_index + 1;
            self.rest_baseline = self.slots[self.active_index].rest_seconds;
            return Outcome::ExerciseAdvanced {
                completed_index: exercise_index,
                next_index: self.active_index,
            };
        }

        self.phase = Phase::Finished;
        let record = recorder::build_record(self, now);
        tracing::info!(
            "Finished '{}' in {}s with {} sets logged",
            self.workout_name,
            self.elapsed.seconds(),
            record.entries.len()
        );
        Outcome::Finished(Box::new(record))
    }

    fn rest_tick(&mut self) -> Outcome {
        let Phase::Resting { remaining } = self.phase else {
            return Outcome::Ignored;
        };

        match RestTimer::tick(remaining) {
            RestTick::Remaining(left) => {
                self.phase = Phase::Resting { remaining: left };
                Outcome::RestTicked { remaining: left }
            }
            RestTick::Expired => {
                self.phase = Phase::Working;
                Outcome::RestEnded { skipped: false }
            }
        }
    }

    fn elapsed_tick(&mut self) -> Outcome {
        if self.phase == Phase::Finished {
            return Outcome::Ignored;
        }
        self.elapsed.tick();
        Outcome::ElapsedTicked {
            elapsed: self.elapsed.seconds(),
        }
    }

    fn adjust_rest(&mut self, delta_seconds: i32) -> Outcome {
        let Phase::Resting { remaining } = self.phase else {
            return Outcome::Ignored;
        };

        let remaining = RestTimer::adjust(remaining, delta_seconds);
        self.phase = Phase::Resting { remaining };
        Outcome::RestAdjusted { remaining }
    }

    fn edit_active_set(&mut self, field: SetField) -> Outcome {
        if self.phase != Phase::Working {
            return Outcome::Ignored;
        }

        let exercise_index = self.active_index;
        let slot = &mut self.slots[exercise_index];
        let Some(set_index) = slot.next_incomplete() else {
            return Outcome::Ignored;
        };

        let set = &mut slot.sets[set_index];
        match field {
            SetField::Weight(weight) => {
                if !weight.is_finite() || weight < 0.0 {
                    tracing::warn!("Ignoring invalid weight {}", weight);
                    return Outcome::Ignored;
                }
                set.weight = weight;
            }
            SetField::Reps(reps) => set.reps = reps,
        }

        Outcome::SetEdited {
            exercise_index,
            set_index,
        }
    }

    fn jump_to_exercise(&mut self, index: usize) -> Outcome {
        if self.phase == Phase::Finished {
            return Outcome::Ignored;
        }
        if index >= self.slots.len() {
            tracing::warn!(
                "Ignoring jump to exercise {} of {}",
                index + 1,
                self.slots.len()
            );
            return Outcome::Ignored;
        }

        self.active_index = index;
        self.rest_baseline = self.slots[index].rest_seconds;
        Outcome::Jumped { index }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn workout_id(&self) -> Option<&str> {
        self.workout_id.as_deref()
    }

    pub fn workout_name(&self) -> &str {
        &self.workout_name
    }

    pub fn slots(&self) -> &[ExerciseSlot] {
        &self.slots
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_slot(&self) -> &ExerciseSlot {
        &self.slots[self.active_index]
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rest_baseline(&self) -> u32 {
        self.rest_baseline
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.seconds()
    }

    /// Snapshot for rendering
    pub fn view(&self) -> SessionView {
        let slot = self.active_slot();
        let (set_index, exercise_complete) = match slot.next_incomplete() {
            Some(idx) => (idx, false),
            None => (slot.sets.len() - 1, true),
        };
        let set = &slot.sets[set_index];

        let queue = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, s)| QueueEntry {
                index,
                name: s.name.clone(),
                status: if index == self.active_index {
                    QueueStatus::Active
                } else if s.is_complete() {
                    QueueStatus::Done
                } else {
                    QueueStatus::Pending
                },
                sets_done: s.sets.iter().map(|set| set.completed).collect(),
            })
            .collect();

        SessionView {
            workout_name: self.workout_name.clone(),
            exercise_name: slot.name.clone(),
            exercise_index: self.active_index,
            exercise_count: self.slots.len(),
            set_number: set_index + 1,
            target_sets: slot.target_sets,
            target_reps: slot.target_reps,
            weight: set.weight,
            reps: set.reps,
            exercise_complete,
            phase: self.phase,
            rest_baseline: self.rest_baseline,
            elapsed: self.elapsed.seconds(),
            queue,
        }
    }
}

/// Position of an exercise in the queue display
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueStatus {
    Active,
    Done,
    Pending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueueEntry {
    pub index: usize,
    pub name: String,
    pub status: QueueStatus,
    pub sets_done: Vec<bool>,
}

/// Observable session state
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub workout_name: String,
    pub exercise_name: String,
    pub exercise_index: usize,
    pub exercise_count: usize,
    /// 1-based; a finished exercise shows its last set
    pub set_number: usize,
    pub target_sets: u32,
    pub target_reps: u32,
    pub weight: f64,
    pub reps: u32,
    pub exercise_complete: bool,
    pub phase: Phase,
    pub rest_baseline: u32,
    pub elapsed: u64,
    pub queue: Vec<QueueEntry>,
}
