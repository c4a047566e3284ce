use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::{Error, Note};

/// Backing storage for the whole notes collection.
///
/// The collection is always read and written as a unit; implementations
/// overwrite their previous contents on every `persist`.
#[async_trait::async_trait]
pub trait NoteStorage: Send + Sync {
    /// Read the full collection. Missing backing data is an empty collection.
    async fn load(&self) -> Result<Vec<Note>, Error>;

    /// Replace the stored collection with `notes`.
    async fn persist(&self, notes: &[Note]) -> Result<(), Error>;
}

/// In-memory storage, used for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    notes: Mutex<Vec<Note>>,
    corrupt: bool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds `notes`.
    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes: Mutex::new(notes),
            ..Self::default()
        }
    }

    /// Storage whose contents cannot be read back.
    pub fn corrupt() -> Self {
        Self {
            corrupt: true,
            ..Self::default()
        }
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of what was last written.
    pub fn snapshot(&self) -> Vec<Note> {
        self.notes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl NoteStorage for MemoryStorage {
    async fn load(&self) -> Result<Vec<Note>, Error> {
        if self.corrupt {
            return Err(Error::Storage("stored notes are not valid JSON".into()));
        }
        Ok(self.snapshot())
    }

    async fn persist(&self, notes: &[Note]) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("write refused".into()));
        }

        let mut stored = self
            .notes
            .lock()
            .map_err(|_| Error::Internal("memory storage lock poisoned".into()))?;
        *stored = notes.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
