//! Single-file JSON storage for jotter.
//!
//! The whole collection lives in one pretty-printed JSON array:
//!
//! ```text
//! <data dir>/
//!   .lock          # Lock file held while writing
//!   notes.json     # [{"id": "...", "title": "...", ...}, ...]
//! ```
//!
//! Every write replaces `notes.json` in full via a temp file and rename.

use fs2::FileExt;
use jotter_core::{Error, Note, NoteStorage};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the collection inside the data directory.
pub const NOTES_FILE: &str = "notes.json";

const LOCK_FILE: &str = ".lock";

/// Notes collection stored as one JSON file.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Open storage in `dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| Error::Storage(format!("Failed to create data dir: {}", e)))?;

        Ok(Self {
            path: dir.join(NOTES_FILE),
        })
    }

    /// Path of the JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Acquire an exclusive lock on the data directory.
    fn lock(&self) -> Result<FileLock, Error> {
        let lock_path = self.dir().join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| Error::Storage(format!("Failed to open lock file: {}", e)))?;

        file.lock_exclusive()
            .map_err(|e| Error::Storage(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }

    fn temp_path(&self) -> PathBuf {
        self.dir().join(format!("{}.tmp", NOTES_FILE))
    }

    /// Write the collection to disk atomically.
    fn write_notes(&self, notes: &[Note]) -> Result<(), Error> {
        let temp_path = self.temp_path();

        let contents = serde_json::to_string_pretty(notes)
            .map_err(|e| Error::Storage(format!("Failed to serialize notes: {}", e)))?;

        let mut file = File::create(&temp_path)
            .map_err(|e| Error::Storage(format!("Failed to create temp file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| Error::Storage(format!("Failed to write temp file: {}", e)))?;

        file.sync_all()
            .map_err(|e| Error::Storage(format!("Failed to sync temp file: {}", e)))?;

        // Atomic rename
        fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::Storage(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }
}

/// RAII guard for file locking.
struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[async_trait::async_trait]
impl NoteStorage for JsonFileStorage {
    async fn load(&self) -> Result<Vec<Note>, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no notes file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::Storage(format!("Failed to read notes: {}", e))),
        };

        let notes: Vec<Note> = serde_json::from_str(&contents)
            .map_err(|e| Error::Storage(format!("Failed to parse notes: {}", e)))?;

        debug!(path = %self.path.display(), count = notes.len(), "read notes file");
        Ok(notes)
    }

    async fn persist(&self, notes: &[Note]) -> Result<(), Error> {
        let _lock = self.lock()?;
        self.write_notes(notes)?;
        debug!(path = %self.path.display(), count = notes.len(), "wrote notes file");
        Ok(())
    }
}
