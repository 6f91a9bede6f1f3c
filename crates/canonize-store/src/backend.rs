//! Record persistence
//!
//! A backend stores at most one record per task. [`CanonBackend::insert_new`]
//! is an atomic check-then-insert; [`CanonBackend::replace`] is the only way
//! to change an existing record.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::record::CanonRecord;

/// Storage of canon records keyed by task id
pub trait CanonBackend: Send + Sync {
    /// Insert `record` unless its task already has one
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] when a record is present
    fn insert_new(&self, record: CanonRecord) -> StoreResult<()>;

    /// Insert or replace the record for its task
    ///
    /// # Errors
    /// Backend I/O or encoding failures
    fn replace(&self, record: CanonRecord) -> StoreResult<()>;

    /// Record for `task_id`, if any
    ///
    /// # Errors
    /// Backend I/O or decoding failures
    fn get(&self, task_id: &str) -> StoreResult<Option<CanonRecord>>;

    /// Delete the record for `task_id`; `false` when there was none
    ///
    /// # Errors
    /// Backend I/O failures
    fn remove(&self, task_id: &str) -> StoreResult<bool>;

    /// Every stored task id, sorted
    ///
    /// # Errors
    /// Backend I/O failures
    fn task_ids(&self) -> StoreResult<Vec<String>>;
}

/// Process-local backend
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: DashMap<String, CanonRecord>,
}

impl InMemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No records stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CanonBackend for InMemoryBackend {
    fn insert_new(&self, record: CanonRecord) -> StoreResult<()> {
        match self.records.entry(record.task_id.clone()) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    fn replace(&self, record: CanonRecord) -> StoreResult<()> {
        self.records.insert(record.task_id.clone(), record);
        Ok(())
    }

    fn get(&self, task_id: &str) -> StoreResult<Option<CanonRecord>> {
        Ok(self.records.get(task_id).map(|entry| entry.value().clone()))
    }

    fn remove(&self, task_id: &str) -> StoreResult<bool> {
        Ok(self.records.remove(task_id).is_some())
    }

    fn task_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self.records.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

/// One JSON document per task under a directory
///
/// Records are written to a temporary file in the same directory and then
/// renamed into place, so readers see either the old record or the new one.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

const EXTENSION: &str = "json";

impl FileBackend {
    /// Open (creating if needed) a backend rooted at `root`
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the directory cannot be created
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Directory holding the records
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, task_id: &str) -> PathBuf {
        self.root.join(format!("{task_id}.{EXTENSION}"))
    }

    fn staged(&self, record: &CanonRecord) -> StoreResult<NamedTempFile> {
        let mut file =
            NamedTempFile::new_in(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        serde_json::to_writer_pretty(&mut file, record)?;
        file.flush().map_err(|e| StoreError::io(file.path(), e))?;
        Ok(file)
    }
}

impl CanonBackend for FileBackend {
    fn insert_new(&self, record: CanonRecord) -> StoreResult<()> {
        let path = self.path_for(&record.task_id);
        let staged = self.staged(&record)?;
        match staged.persist_noclobber(&path) {
            Ok(_) => {
                debug!(path = %path.display(), "canon record written");
                Ok(())
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(record.task_id))
            }
            Err(e) => Err(StoreError::io(path, e.error)),
        }
    }

    fn replace(&self, record: CanonRecord) -> StoreResult<()> {
        let path = self.path_for(&record.task_id);
        let staged = self.staged(&record)?;
        staged
            .persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;
        debug!(path = %path.display(), "canon record replaced");
        Ok(())
    }

    fn get(&self, task_id: &str) -> StoreResult<Option<CanonRecord>> {
        let path = self.path_for(task_id);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn remove(&self, task_id: &str) -> StoreResult<bool> {
        let path = self.path_for(task_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn task_ids(&self) -> StoreResult<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.root, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
