//! Durable storage for the learned table.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};
use thiserror::Error;

use crate::table::QTable;

/// Failures while reading or writing a persisted table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage could not be accessed.
    #[error("q-table storage unavailable: {0}")]
    Io(#[from] io::Error),
    /// The stored blob is not a valid table.
    #[error("q-table blob is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Storage backend holding a serialized table blob.
pub trait QTableStore {
    /// Reads the stored blob, `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replaces the stored blob.
    fn save(&mut self, blob: &str) -> Result<(), StoreError>;
}

/// Stores the table as a JSON file on disk.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QTableStore for JsonFileStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn save(&mut self, blob: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, blob)?;
        Ok(())
    }
}

/// Keeps the blob in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    blob: Option<String>,
}

impl MemoryStore {
    /// Creates a store pre-filled with `blob`.
    #[must_use]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
        }
    }

    /// Last saved blob.
    #[must_use]
    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl QTableStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.blob.clone())
    }

    fn save(&mut self, blob: &str) -> Result<(), StoreError> {
        self.blob = Some(blob.to_owned());
        Ok(())
    }
}

impl QTable {
    /// Loads the table from `store`, falling back to an empty table on any failure.
    pub fn load_or_default(store: &dyn QTableStore) -> Self {
        let loaded = store
            .load()
            .and_then(|blob| blob.map(|blob| QTable::from_blob(&blob)).transpose());
        match loaded {
            Ok(Some(table)) => {
                info!("loaded q-table with {} entries", table.len());
                table
            }
            Ok(None) => QTable::new(),
            Err(error) => {
                warn!("starting with an empty q-table: {error}");
                QTable::new()
            }
        }
    }

    /// Writes the table to `store`.
    pub fn save_to(&self, store: &mut dyn QTableStore) -> Result<(), StoreError> {
        store.save(&self.to_blob()?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use conquer_core::TowerKind;

    use super::*;
    use crate::table::{Action, StateKey};

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        std::env::temp_dir().join(format!("conquer-{name}-{}-{nanos}.json", std::process::id()))
    }

    #[test]
    fn corrupt_blobs_fall_back_to_an_empty_table() {
        let store = MemoryStore::with_blob("{ not json");
        assert!(QTable::load_or_default(&store).is_empty());
    }

    #[test]
    fn missing_files_load_as_empty() {
        let store = JsonFileStore::new(scratch_path("missing"));
        assert!(matches!(store.load(), Ok(None)));
        assert!(QTable::load_or_default(&store).is_empty());
    }

    #[test]
    fn file_store_keeps_saved_values() {
        let path = scratch_path("saved");
        let mut store = JsonFileStore::new(&path);
        let state = StateKey {
            health: 2,
            gold: 1,
            towers: 0,
            enemies: 3,
            wave: 1,
        };
        let mut table = QTable::new();
        table.set(state, Action::Build(TowerKind::Bullet), 0.5);

        table.save_to(&mut store).expect("saves");
        let loaded = QTable::load_or_default(&store);
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, table);
    }
}
