//! Completion recording.
//!
//! Builds the summary of a finished session and hands it to a
//! `CompletionSink`. Saving is fire-and-forget from the session's point of
//! view: a failed save is reported, never retried, and never reopens the
//! session.

use crate::session::WorkoutSession;
use crate::wal::CompletionSink;
use crate::{CompletionRecord, Error, SetLogEntry, WorkoutStatus};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Build the completion record for a session at `now`
///
/// Only completed sets are logged. The start time is derived from the
/// elapsed clock rather than remembered.
pub fn build_record(session: &WorkoutSession, now: DateTime<Utc>) -> CompletionRecord {
    let elapsed = session.elapsed_seconds();

    let entries = session
        .slots()
        .iter()
        .flat_map(|slot| {
            slot.sets
                .iter()
                .enumerate()
                .filter(|(_, set)| set.completed)
                .map(move |(idx, set)| SetLogEntry {
                    exercise_id: slot.exercise_id.clone(),
                    workout_exercise_id: slot.workout_exercise_id.clone(),
                    set_number: idx as u32 + 1,
                    reps: set.reps,
                    weight: set.weight,
                })
        })
        .collect();

    CompletionRecord {
        id: Uuid::new_v4(),
        user_id: session.user_id().to_string(),
        workout_id: session.workout_id().map(str::to_string),
        workout_name: session.workout_name().to_string(),
        status: WorkoutStatus::Completed,
        started_at: now - Duration::seconds(elapsed as i64),
        completed_at: now,
        duration_seconds: elapsed,
        entries,
    }
}

/// How handing a record to persistence went
#[derive(Debug)]
pub enum Delivery {
    Saved,
    /// The workout still counts as finished
    Failed(Error),
}

impl Delivery {
    pub fn is_saved(&self) -> bool {
        matches!(self, Delivery::Saved)
    }
}

/// Hand a completion record to the sink
pub fn deliver(sink: &mut dyn CompletionSink, record: &CompletionRecord) -> Delivery {
    match sink.persist(record) {
        Ok(()) => {
            tracing::info!(
                "Saved completion record {} for user {}",
                record.id,
                record.user_id
            );
            Delivery::Saved
        }
        Err(e) => {
            tracing::error!("Failed to save completion record {}: {}", record.id, e);
            Delivery::Failed(Error::Persistence(e.to_string()))
        }
    }
}
