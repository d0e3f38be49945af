//! Per-user exercise defaults persistence with file locking.
//!
//! Defaults are the user's preferred starting weight and reps for an
//! exercise. They take precedence over history and template values when
//! a session plan is loaded.

use crate::loader::ExerciseDefaultsSource;
use crate::{Error, Result, UserDefaultsState};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl UserDefaultsState {
    /// Load defaults from a file with shared locking
    ///
    /// Returns empty defaults if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns empty defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No defaults file found, using empty defaults");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open defaults file {:?}: {}. Using empty defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock defaults file {:?}: {}. Using empty defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read defaults file {:?}: {}. Using empty defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<UserDefaultsState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded exercise defaults from {:?}", path);
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse defaults file {:?}: {}. Using empty defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save defaults to a file with exclusive locking
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            Error::State(format!("defaults path {:?} has no parent directory", path))
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved exercise defaults to {:?}", path);
        Ok(())
    }

    /// Load defaults, modify them, and save them back
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut UserDefaultsState) -> Result<()>,
    {
        let mut state = Self::load(path)?;
        f(&mut state)?;
        state.save(path)?;
        Ok(state)
    }
}

impl ExerciseDefaultsSource for UserDefaultsState {
    fn default_weight(&self, user_id: &str, exercise_id: &str) -> Result<Option<f64>> {
        Ok(self
            .get(user_id, exercise_id)
            .and_then(|d| d.default_weight_kg))
    }

    fn default_reps(&self, user_id: &str, exercise_id: &str) -> Result<Option<u32>> {
        Ok(self.get(user_id, exercise_id).and_then(|d| d.default_reps))
    }
}
