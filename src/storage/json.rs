use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{check_revisions, CycleStore, Snapshot};
use crate::error::StorageError;
use crate::models::TrainingCycle;

pub const DEFAULT_FILE_NAME: &str = "training_cycles.json";

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Cycles kept as a single pretty-printed JSON document
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at `<data_dir>/training_cycles.json`
    pub fn in_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self::new(data_dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the data file, if any
    pub fn delete_all(&mut self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| io_error(&self.path, e))?;
            info!(path = %self.path.display(), "deleted all cycles");
        }
        Ok(())
    }

    /// Copy the data file to a timestamped backup in `backup_dir`.
    ///
    /// Returns `None` when there is nothing to back up.
    pub fn create_backup<P: AsRef<Path>>(&self, backup_dir: P) -> Result<Option<PathBuf>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup_dir = backup_dir.as_ref();
        fs::create_dir_all(backup_dir).map_err(|e| io_error(backup_dir, e))?;

        let backup_path = backup_dir.join(format!(
            "training_cycles_backup_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S%3f")
        ));
        fs::copy(&self.path, &backup_path).map_err(|e| io_error(&backup_path, e))?;
        info!(backup = %backup_path.display(), "backup created");
        Ok(Some(backup_path))
    }

    /// Replace the data file with a backup after checking it parses
    pub fn restore_from_backup<P: AsRef<Path>>(&mut self, backup_path: P) -> Result<usize, StorageError> {
        let backup_path = backup_path.as_ref();
        let data = fs::read(backup_path).map_err(|e| io_error(backup_path, e))?;
        let cycles: Vec<TrainingCycle> = serde_json::from_slice(&data)?;

        self.write_atomic(&data)?;
        info!(
            backup = %backup_path.display(),
            cycles = cycles.len(),
            "restored from backup"
        );
        Ok(cycles.len())
    }

    fn write_atomic(&self, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data).map_err(|e| io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| io_error(&self.path, e))
    }
}

impl CycleStore for JsonFileStore {
    fn load(&self) -> Result<Vec<TrainingCycle>, StorageError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no saved cycles");
            return Ok(Vec::new());
        }
        let data = fs::read(&self.path).map_err(|e| io_error(&self.path, e))?;
        let cycles: Vec<TrainingCycle> = serde_json::from_slice(&data).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to parse cycles");
            StorageError::from(e)
        })?;
        info!(count = cycles.len(), "loaded cycles");
        Ok(cycles)
    }

    fn save(&mut self, cycles: &[TrainingCycle], seen: &Snapshot) -> Result<(), StorageError> {
        let stored = self.load()?;
        check_revisions(&stored, cycles, seen)?;

        let data = serde_json::to_vec_pretty(cycles)?;
        self.write_atomic(&data)?;
        info!(count = cycles.len(), path = %self.path.display(), "saved cycles");
        Ok(())
    }
}
