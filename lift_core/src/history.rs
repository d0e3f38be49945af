//! Completion history from the live WAL and the CSV archive.
//!
//! The loader asks history for the weight a user last lifted on an
//! exercise. Records can appear in both files around a rollup, so they are
//! deduplicated by record id.

use crate::csv_rollup::CsvRow;
use crate::loader::PerformanceHistory;
use crate::{CompletionRecord, Error, Result, SetLogEntry, WorkoutStatus};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

/// Completed sessions, newest first
#[derive(Clone, Debug, Default)]
pub struct SessionHistory {
    records: Vec<CompletionRecord>,
}

impl SessionHistory {
    pub fn new(mut records: Vec<CompletionRecord>) -> Self {
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Self { records }
    }

    /// Load history from the WAL and the CSV archive
    pub fn load(wal_path: &Path, csv_path: &Path) -> Result<Self> {
        let mut records = Vec::new();
        let mut seen_ids = HashSet::new();

        // WAL first (most recent)
        if wal_path.exists() {
            for record in crate::wal::read_records(wal_path)? {
                if seen_ids.insert(record.id) {
                    records.push(record);
                }
            }
            tracing::debug!("Loaded {} records from WAL", records.len());
        }

        if csv_path.exists() {
            let mut csv_count = 0;
            for record in load_records_from_csv(csv_path)? {
                if seen_ids.insert(record.id) {
                    records.push(record);
                    csv_count += 1;
                }
            }
            tracing::debug!("Loaded {} records from CSV", csv_count);
        }

        tracing::info!("Loaded {} completion records", records.len());
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[CompletionRecord] {
        &self.records
    }

    /// Most recent record for the user that includes the exercise
    pub fn last_record_with<'a>(
        &'a self,
        user_id: &str,
        exercise_id: &str,
    ) -> Option<&'a CompletionRecord> {
        self.records.iter().find(|r| {
            r.user_id == user_id && r.entries.iter().any(|e| e.exercise_id == exercise_id)
        })
    }
}

impl PerformanceHistory for SessionHistory {
    fn last_performed_weight(&self, user_id: &str, exercise_id: &str) -> Result<Option<f64>> {
        let weight = self.last_record_with(user_id, exercise_id).and_then(|record| {
            record
                .entries
                .iter()
                .filter(|e| e.exercise_id == exercise_id)
                .max_by_key(|e| e.set_number)
                .map(|e| e.weight)
        });
        Ok(weight)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid date '{}': {}", value, e)))
}

/// Rebuild completion records from archived set rows
fn load_records_from_csv(path: &Path) -> Result<Vec<CompletionRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut records: Vec<CompletionRecord> = Vec::new();
    let mut index_by_id: HashMap<Uuid, usize> = HashMap::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
                continue;
            }
        };

        let id = match Uuid::parse_str(&row.record_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Invalid record id '{}' in CSV: {}", row.record_id, e);
                continue;
            }
        };

        let entry = SetLogEntry {
            exercise_id: row.exercise_id,
            workout_exercise_id: row.workout_exercise_id,
            set_number: row.set_number,
            reps: row.reps,
            weight: row.weight,
        };

        if let Some(&idx) = index_by_id.get(&id) {
            records[idx].entries.push(entry);
            continue;
        }

        let (started_at, completed_at) =
            match (parse_timestamp(&row.started_at), parse_timestamp(&row.completed_at)) {
                (Ok(s), Ok(c)) => (s, c),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("Failed to parse CSV row: {}", e);
                    continue;
                }
            };

        index_by_id.insert(id, records.len());
        records.push(CompletionRecord {
            id,
            user_id: row.user_id,
            workout_id: row.workout_id,
            workout_name: row.workout_name,
            status: WorkoutStatus::Completed,
            started_at,
            completed_at,
            duration_seconds: row.duration,
            entries: vec![entry],
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::tests::create_test_record;
    use crate::wal::{CompletionSink, JsonlSink};
    use chrono::Duration;

    fn record_days_ago(user: &str, exercise: &str, weight: f64, days: i64) -> CompletionRecord {
        let mut record = create_test_record(user, exercise, weight);
        record.completed_at = record.completed_at - Duration::days(days);
        record.started_at = record.started_at - Duration::days(days);
        record
    }

    #[test]
    fn test_last_performed_weight_uses_most_recent_record() {
        let history = SessionHistory::new(vec![
            record_days_ago("u1", "squat", 90.0, 5),
            record_days_ago("u1", "squat", 100.0, 1),
            record_days_ago("u1", "squat", 95.0, 3),
        ]);

        assert_eq!(
            history.last_performed_weight("u1", "squat").unwrap(),
            Some(100.0)
        );
    }

    #[test]
    fn test_last_performed_weight_takes_highest_set() {
        let mut record = create_test_record("u1", "squat", 100.0);
        record.entries[1].weight = 105.0;
        let history = SessionHistory::new(vec![record]);

        assert_eq!(
            history.last_performed_weight("u1", "squat").unwrap(),
            Some(105.0)
        );
    }

    #[test]
    fn test_last_performed_weight_is_per_user_and_exercise() {
        let history = SessionHistory::new(vec![
            record_days_ago("u2", "squat", 140.0, 0),
            record_days_ago("u1", "bench", 70.0, 0),
        ]);

        assert_eq!(history.last_performed_weight("u1", "squat").unwrap(), None);
        assert_eq!(
            history.last_performed_weight("u1", "bench").unwrap(),
            Some(70.0)
        );
    }

    #[test]
    fn test_load_from_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("completions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.persist(&record_days_ago("u1", "squat", 80.0, 2)).unwrap();
        sink.persist(&record_days_ago("u1", "squat", 85.0, 1)).unwrap();

        let history = SessionHistory::load(&wal_path, &csv_path).unwrap();
        assert_eq!(history.records().len(), 2);
        assert_eq!(history.records()[0].entries[0].weight, 85.0);
    }

    #[test]
    fn test_deduplication_across_wal_and_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("completions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let record = create_test_record("u1", "squat", 100.0);
        let mut sink = JsonlSink::new(&wal_path);
        sink.persist(&record).unwrap();

        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        // Put the same record back in a fresh WAL
        let mut sink = JsonlSink::new(&wal_path);
        sink.persist(&record).unwrap();

        let history = SessionHistory::load(&wal_path, &csv_path).unwrap();
        assert_eq!(history.records().len(), 1);
        assert_eq!(history.records()[0].id, record.id);
    }

    #[test]
    fn test_csv_rows_regroup_into_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("completions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.persist(&create_test_record("u1", "squat", 100.0)).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let history = SessionHistory::load(&wal_path, &csv_path).unwrap();
        assert_eq!(history.records().len(), 1);
        assert_eq!(history.records()[0].entries.len(), 2);
        assert_eq!(history.records()[0].workout_id.as_deref(), Some("w1"));
        assert_eq!(
            history.last_performed_weight("u1", "squat").unwrap(),
            Some(100.0)
        );
    }
}
