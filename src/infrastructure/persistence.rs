use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{DraftSnapshot, DraftStore, PersistenceError};

pub const DEFAULT_DRAFT_FILE: &str = "submission_draft.json";

/// Draft store backed by a single JSON file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the draft, so a crash mid-save never leaves a truncated draft behind.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        self.path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, snapshot: &DraftSnapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let dir = self.directory();
        fs::create_dir_all(dir)?;
        let temp = tempfile::NamedTempFile::new_in(dir)?;
        fs::write(temp.path(), json)?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<DraftSnapshot>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryDraftState {
    snapshot: Option<DraftSnapshot>,
    saves: usize,
    clears: usize,
    fail_saves: bool,
}

/// In-process draft store. Clones share the same slot, so a test can keep a
/// handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    state: Arc<Mutex<MemoryDraftState>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<DraftSnapshot> {
        self.lock().snapshot.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    /// Makes subsequent saves fail until switched off again.
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryDraftState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, snapshot: &DraftSnapshot) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        if state.fail_saves {
            return Err(io::Error::other("draft storage unavailable").into());
        }
        state.snapshot = Some(snapshot.clone());
        state.saves += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<DraftSnapshot>, PersistenceError> {
        Ok(self.lock().snapshot.clone())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        state.snapshot = None;
        state.clears += 1;
        Ok(())
    }
}
