//! CSV rollup functionality for archiving WAL completion records.
//!
//! The archive holds one row per performed set, so each completion record
//! expands to as many rows as it has log entries.

use crate::{CompletionRecord, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV archive
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct CsvRow {
    pub record_id: String,
    pub user_id: String,
    pub workout_id: Option<String>,
    pub workout_name: String,
    pub started_at: String,
    pub completed_at: String,
    pub duration: u64,
    pub exercise_id: String,
    pub workout_exercise_id: String,
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
}

impl CsvRow {
    fn rows_for(record: &CompletionRecord) -> Vec<CsvRow> {
        record
            .entries
            .iter()
            .map(|entry| CsvRow {
                record_id: record.id.to_string(),
                user_id: record.user_id.clone(),
                workout_id: record.workout_id.clone(),
                workout_name: record.workout_name.clone(),
                started_at: record.started_at.to_rfc3339(),
                completed_at: record.completed_at.to_rfc3339(),
                duration: record.duration_seconds,
                exercise_id: entry.exercise_id.clone(),
                workout_exercise_id: entry.workout_exercise_id.clone(),
                set_number: entry.set_number,
                reps: entry.reps,
                weight: entry.weight,
            })
            .collect()
    }
}

/// Roll up WAL records into CSV and archive the WAL atomically
///
/// This function:
/// 1. Reads all records from the WAL
/// 2. Appends their set entries to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of records processed
///
/// Records without entries have nothing to archive and are dropped.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = crate::wal::read_records(wal_path)?;

    if records.is_empty() {
        tracing::info!("No records in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    let mut row_count = 0;
    for record in &records {
        for row in CsvRow::rows_for(record) {
            writer.serialize(row)?;
            row_count += 1;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!(
        "Wrote {} set rows from {} records to CSV",
        row_count,
        records.len()
    );

    // CSV is on disk before the WAL goes away
    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(records.len())
}

/// Clean up old processed WAL files
///
/// This removes all .wal.processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(extension) = path.extension() {
            if extension == "processed" {
                std::fs::remove_file(&path)?;
                tracing::debug!("Removed processed WAL: {:?}", path);
                count += 1;
            }
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
