//! Jotter core library - note types, the notes store, and editor state.
//!
//! This crate does no file I/O; storage backends implement [`NoteStorage`].

mod api;
pub mod datefmt;
mod error;
mod note;
mod session;
mod storage;
mod store;

pub use api::{dispatch, Event, NotesApi, Request, Response};
pub use error::Error;
pub use note::{word_count, Note, NoteSummary, NO_CONTENT, UNTITLED};
pub use session::{EditorSession, ListItem, Mode, Status, StatusKind};
pub use storage::{MemoryStorage, NoteStorage};
pub use store::{Deleted, MissingNotePolicy, NotesStore, SaveOutcome, Saved, StoreConfig};
