//! Rollup persistence
//!
//! Aggregation logic only sees the [`RollupStore`] trait. The JSON file
//! store keeps three artifacts per entity: the rollup state, the
//! processed-file index and a flattened CSV summary.

use crate::types::{ProcessedFileIndex, Result, RollupError, RollupState};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Key-value store of per-entity rollup state
pub trait RollupStore: Send + Sync {
    /// Load the entity's rollup; `None` if nothing was ever stored
    fn get(&self, entity: &str) -> Result<Option<RollupState>>;

    /// Filenames already absorbed for the entity; empty if none
    fn processed_files(&self, entity: &str) -> Result<ProcessedFileIndex>;

    /// Persist state and index together
    fn put(&self, entity: &str, state: &RollupState, index: &ProcessedFileIndex) -> Result<()>;

    /// Forget everything stored for the entity
    fn clear(&self, entity: &str) -> Result<()>;
}

/// Artifacts in a directory: `{ENTITY}_rollup.json`,
/// `{ENTITY}_processed.json` and `{ENTITY}_summary.csv`
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn rollup_path(&self, entity: &str) -> PathBuf {
        self.dir.join(format!("{}_rollup.json", entity))
    }

    pub fn index_path(&self, entity: &str) -> PathBuf {
        self.dir.join(format!("{}_processed.json", entity))
    }

    pub fn summary_path(&self, entity: &str) -> PathBuf {
        self.dir.join(format!("{}_summary.csv", entity))
    }

    fn lock_path(&self, entity: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", entity))
    }

    /// Open (creating if needed) the entity's lock file
    fn lock_file(&self, entity: &str) -> Result<File> {
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path(entity))?;
        Ok(file)
    }

    /// Read a file under a shared lock. `None` if it does not exist.
    fn read_locked(&self, entity: &str, path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }

        let lock = self.lock_file(entity)?;
        lock.lock_shared()
            .map_err(|e| RollupError::Store(format!("Failed to acquire read lock: {}", e)))?;

        let result = File::open(path).and_then(|mut file| {
            let mut content = String::new();
            file.read_to_string(&mut content).map(|_| content)
        });

        let _ = lock.unlock();
        Ok(Some(result?))
    }

    fn read_index_artifact(&self, entity: &str) -> Result<ProcessedFileIndex> {
        let path = self.index_path(entity);
        match self.read_locked(entity, &path)? {
            None => Ok(ProcessedFileIndex::new()),
            Some(content) => serde_json::from_str(&content).map_err(|e| {
                RollupError::Store(format!("Corrupted index file {}: {}", path.display(), e))
            }),
        }
    }

    /// Write `bytes` to a `.tmp` sibling of `path` and sync it
    fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let temp_path = path.with_extension(match path.extension() {
            Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
            None => "tmp".to_string(),
        });

        let mut file = File::create(&temp_path)
            .map_err(|e| RollupError::Store(format!("Failed to create temp file: {}", e)))?;
        file.write_all(bytes)
            .map_err(|e| RollupError::Store(format!("Failed to write temp file: {}", e)))?;
        file.sync_all()
            .map_err(|e| RollupError::Store(format!("Failed to sync temp file: {}", e)))?;

        Ok(temp_path)
    }

    fn summary_csv(state: &RollupState) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in state.summary_rows() {
            writer.serialize(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| RollupError::Store(format!("Failed to flush summary: {}", e)))
    }
}

impl RollupStore for JsonFileStore {
    fn get(&self, entity: &str) -> Result<Option<RollupState>> {
        let path = self.rollup_path(entity);
        let Some(content) = self.read_locked(entity, &path)? else {
            return Ok(None);
        };

        let mut state: RollupState = serde_json::from_str(&content).map_err(|e| {
            RollupError::Store(format!("Corrupted rollup file {}: {}", path.display(), e))
        })?;
        state.recompute_averages();
        Ok(Some(state))
    }

    /// Union of the index artifact and the files recorded in the rollup,
    /// so an interrupted write can never lead to a second merge.
    fn processed_files(&self, entity: &str) -> Result<ProcessedFileIndex> {
        let mut index = self.read_index_artifact(entity)?;
        if let Some(state) = self.get(entity)? {
            index.extend(&state.processed_files);
        }
        Ok(index)
    }

    /// Stage every artifact before renaming any, rollup first, under an
    /// exclusive lock.
    fn put(&self, entity: &str, state: &RollupState, index: &ProcessedFileIndex) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let rollup_json = serde_json::to_string_pretty(state)
            .map_err(|e| RollupError::Store(format!("Serialization failed: {}", e)))?;
        let index_json = serde_json::to_string_pretty(index)
            .map_err(|e| RollupError::Store(format!("Serialization failed: {}", e)))?;
        let summary = Self::summary_csv(state)?;

        let targets = [
            (self.rollup_path(entity), rollup_json.into_bytes()),
            (self.index_path(entity), index_json.into_bytes()),
            (self.summary_path(entity), summary),
        ];

        let mut staged = Vec::with_capacity(targets.len());
        for (path, bytes) in &targets {
            match Self::stage(path, bytes) {
                Ok(temp) => staged.push((temp, path.clone())),
                Err(e) => {
                    for (temp, _) in &staged {
                        let _ = fs::remove_file(temp);
                    }
                    return Err(e);
                }
            }
        }

        let lock = self.lock_file(entity)?;
        lock.lock_exclusive()
            .map_err(|e| RollupError::Store(format!("Failed to acquire write lock: {}", e)))?;

        let mut result = Ok(());
        for (temp, path) in &staged {
            if let Err(e) = fs::rename(temp, path) {
                result = Err(RollupError::Store(format!(
                    "Failed to rename {}: {}",
                    temp.display(),
                    e
                )));
                break;
            }
            debug!(entity, path = %path.display(), "artifact written");
        }

        let _ = lock.unlock();
        for (temp, _) in &staged {
            if temp.exists() {
                let _ = fs::remove_file(temp);
            }
        }
        result
    }

    fn clear(&self, entity: &str) -> Result<()> {
        for path in [
            self.rollup_path(entity),
            self.index_path(entity),
            self.summary_path(entity),
        ] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// In-memory store, for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (RollupState, ProcessedFileIndex)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (RollupState, ProcessedFileIndex)>>> {
        self.entries
            .lock()
            .map_err(|_| RollupError::Store("memory store lock poisoned".into()))
    }
}

impl RollupStore for MemoryStore {
    fn get(&self, entity: &str) -> Result<Option<RollupState>> {
        Ok(self.entries()?.get(entity).map(|(state, _)| state.clone()))
    }

    fn processed_files(&self, entity: &str) -> Result<ProcessedFileIndex> {
        Ok(self
            .entries()?
            .get(entity)
            .map(|(state, index)| {
                let mut merged = index.clone();
                merged.extend(&state.processed_files);
                merged
            })
            .unwrap_or_default())
    }

    fn put(&self, entity: &str, state: &RollupState, index: &ProcessedFileIndex) -> Result<()> {
        self.entries()?
            .insert(entity.to_string(), (state.clone(), index.clone()));
        Ok(())
    }

    fn clear(&self, entity: &str) -> Result<()> {
        self.entries()?.remove(entity);
        Ok(())
    }
}
