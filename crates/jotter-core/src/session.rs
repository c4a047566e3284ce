//! Front-end editor state.
//!
//! An [`EditorSession`] holds the note being edited and the last collection
//! received from the store, and turns user intent (new, select, edit, save,
//! delete, search) into [`NotesApi`] calls. It never touches the store's
//! collection directly.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::datefmt::humanize;
use crate::{word_count, Error, Event, Note, NoteSummary, NotesApi};

const PREVIEW_LEN: usize = 100;

/// Which kind of note the editor holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// An unsaved draft.
    Drafting,
    /// A persisted note.
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Modified,
    Error,
}

/// The status line shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
}

impl Status {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Info,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Error,
        }
    }
}

/// One row of the rendered notes list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub summary: NoteSummary,
    /// Humanized `updatedAt`, empty if it could not be parsed.
    pub date: String,
    /// The note is the one open in the editor.
    pub active: bool,
}

pub struct EditorSession {
    notes: Vec<Note>,
    query: Option<String>,
    results: Vec<Note>,
    current: Note,
    modified: bool,
    status: Status,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// A session with no notes, drafting a new one.
    pub fn new() -> Self {
        Self {
            notes: Vec::new(),
            query: None,
            results: Vec::new(),
            current: Note::draft(),
            modified: false,
            status: Status::info("Ready"),
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::NotesLoaded { notes } => self.on_loaded(notes),
        }
    }

    /// Take the startup collection and open its first note, or a draft.
    pub fn on_loaded(&mut self, notes: Vec<Note>) {
        debug!(count = notes.len(), "session received notes");
        self.notes = notes;
        self.open_first_or_draft();
        self.status = Status::info("Notes loaded");
    }

    pub fn mode(&self) -> Mode {
        if self.current.is_draft() {
            Mode::Drafting
        } else {
            Mode::Editing
        }
    }

    pub fn current(&self) -> &Note {
        &self.current
    }

    /// The last full collection received from the store.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// The notes to display: search results while searching, else all.
    pub fn visible(&self) -> &[Note] {
        if self.query.is_some() {
            &self.results
        } else {
            &self.notes
        }
    }

    pub fn search_query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.current.content)
    }

    /// Rows for the visible notes, dated relative to `now`.
    pub fn list_items(&self, now: DateTime<Utc>) -> Vec<ListItem> {
        self.visible()
            .iter()
            .map(|note| ListItem {
                summary: note.to_summary(PREVIEW_LEN),
                date: note
                    .last_touched()
                    .and_then(|ts| humanize(ts, now))
                    .unwrap_or_default(),
                active: note.id.is_some() && note.id == self.current.id,
            })
            .collect()
    }

    /// Start a fresh draft.
    pub fn new_note(&mut self) {
        self.start_draft();
        self.status = Status::info("New note created");
    }

    /// Open the note with `id` from the last received collection.
    pub fn select(&mut self, id: &str) -> bool {
        match self.notes.iter().find(|n| n.has_id(id)).cloned() {
            Some(note) => {
                self.load(note);
                true
            }
            None => false,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.current.title = title.into();
        self.mark_modified();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.current.content = content.into();
        self.mark_modified();
    }

    /// Save the current note and reset to a fresh draft.
    ///
    /// Refused without a store call when the note is blank. A write failure
    /// still counts as saved, since the store keeps the change in memory; the
    /// status reports the failure. If the note being edited no longer exists
    /// in the store, the editor keeps its text as a new draft instead.
    pub async fn save<A: NotesApi + ?Sized>(&mut self, api: &A) -> Result<(), Error> {
        if self.current.is_blank() {
            self.status = Status::error("Cannot save empty note");
            return Err(Error::Validation("cannot save empty note".into()));
        }

        let editing = self.current.id.clone();
        match api.save_note(self.current.clone()).await {
            Ok(notes) => {
                let missing = editing
                    .as_deref()
                    .filter(|id| !notes.iter().any(|n| n.has_id(id)))
                    .map(str::to_string);
                self.notes = notes;

                if let Some(id) = missing {
                    self.detach_current();
                    self.refresh_search(api).await;
                    return Err(Error::NotFound(format!("note {}", id)));
                }

                self.start_draft();
                self.status = Status::info("Note saved");
                self.refresh_search(api).await;
                Ok(())
            }
            Err(Error::NotFound(message)) => {
                self.resync(api).await;
                self.detach_current();
                Err(Error::NotFound(message))
            }
            Err(Error::Persist(message)) => {
                self.resync(api).await;
                self.start_draft();
                self.status = Status::error("Note saved, but could not be written to disk");
                Err(Error::Persist(message))
            }
            Err(e) => {
                self.status = Status::error("Error saving note");
                Err(e)
            }
        }
    }

    /// Delete the open note, then open the first remaining note or a draft.
    ///
    /// Returns `Ok(false)` without a store call when editing a draft. A write
    /// failure still counts as deleted; the status reports the failure.
    pub async fn delete<A: NotesApi + ?Sized>(&mut self, api: &A) -> Result<bool, Error> {
        let id = match self.current.id.clone() {
            Some(id) => id,
            None => return Ok(false),
        };

        match api.delete_note(&id).await {
            Ok(notes) => {
                self.notes = notes;
                self.open_first_or_draft();
                self.status = Status::info("Note deleted");
                self.refresh_search(api).await;
                Ok(true)
            }
            Err(Error::Persist(message)) => {
                self.resync(api).await;
                self.open_first_or_draft();
                self.status = Status::error("Note deleted, but could not be written to disk");
                Err(Error::Persist(message))
            }
            Err(e) => {
                self.status = Status::error("Error deleting note");
                Err(e)
            }
        }
    }

    /// Filter the displayed list. A blank query clears the search.
    ///
    /// Returns the number of visible notes.
    pub async fn search<A: NotesApi + ?Sized>(
        &mut self,
        api: &A,
        query: &str,
    ) -> Result<usize, Error> {
        let query = query.trim();
        if query.is_empty() {
            self.clear_search();
            return Ok(self.notes.len());
        }

        self.results = api.search_notes(Some(query)).await?;
        self.query = Some(query.to_string());
        self.status = Status::info(format!("Found {} results", self.results.len()));
        Ok(self.results.len())
    }

    pub fn clear_search(&mut self) {
        self.query = None;
        self.results.clear();
        self.status = Status::info("Ready");
    }

    /// Re-run the active search against the store.
    ///
    /// If the store cannot search, results are filtered from the local list
    /// and the status reports the failure.
    async fn refresh_search<A: NotesApi + ?Sized>(&mut self, api: &A) {
        let query = match self.query.clone() {
            Some(query) => query,
            None => return,
        };

        match api.search_notes(Some(&query)).await {
            Ok(results) => self.results = results,
            Err(e) => {
                warn!(error = %e, "search refresh failed, filtering locally");
                let needle = query.to_lowercase();
                self.results = self
                    .notes
                    .iter()
                    .filter(|n| n.matches(&needle))
                    .cloned()
                    .collect();
                self.status = Status::error("Error refreshing search");
            }
        }
    }

    /// Pick up the store's in-memory collection after a failed mutation.
    async fn resync<A: NotesApi + ?Sized>(&mut self, api: &A) {
        if let Ok(notes) = api.get_notes().await {
            self.notes = notes;
        }
        self.refresh_search(api).await;
    }

    /// Turn the open note into a draft with the same text.
    fn detach_current(&mut self) {
        self.current.id = None;
        self.current.created_at = None;
        self.current.updated_at = None;
        self.modified = true;
        self.status = Status::error("Note no longer exists, save again to keep it as a new note");
    }

    fn open_first_or_draft(&mut self) {
        match self.notes.first().cloned() {
            Some(note) => self.load(note),
            None => self.start_draft(),
        }
    }

    fn load(&mut self, note: Note) {
        self.current = note;
        self.modified = false;
        self.status = Status::info("Note loaded");
    }

    fn start_draft(&mut self) {
        self.current = Note::draft();
        self.modified = false;
    }

    fn mark_modified(&mut self) {
        self.modified = true;
        self.status = Status {
            message: "Modified".to_string(),
            kind: StatusKind::Modified,
        };
    }
}
