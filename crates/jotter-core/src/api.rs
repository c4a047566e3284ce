//! The call surface between a front end and the notes store.
//!
//! Four request/response calls plus a one-shot startup event. The same
//! contract is available as the [`NotesApi`] trait (used by
//! [`EditorSession`](crate::EditorSession)) and as serializable
//! [`Request`]/[`Response`] messages for front ends on the other side of a
//! pipe.

use serde::{Deserialize, Serialize};

use crate::{Error, Note, NoteStorage, NotesStore};

/// A front-end request, e.g. `{"op":"search","query":"milk"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    List,
    Save {
        note: Note,
    },
    Delete {
        id: String,
    },
    Search {
        #[serde(default)]
        query: Option<String>,
    },
}

/// Reply to a [`Request`]: the resulting collection, or an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Notes { notes: Vec<Note> },
    Error { error: String },
}

/// Notifications pushed to the front end without a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    /// The collection finished loading at startup. Sent once.
    NotesLoaded { notes: Vec<Note> },
}

/// The four store calls as seen from a front end.
#[async_trait::async_trait]
pub trait NotesApi: Send + Sync {
    async fn get_notes(&self) -> Result<Vec<Note>, Error>;

    async fn save_note(&self, note: Note) -> Result<Vec<Note>, Error>;

    async fn delete_note(&self, id: &str) -> Result<Vec<Note>, Error>;

    async fn search_notes(&self, query: Option<&str>) -> Result<Vec<Note>, Error>;
}

#[async_trait::async_trait]
impl<S: NoteStorage> NotesApi for NotesStore<S> {
    async fn get_notes(&self) -> Result<Vec<Note>, Error> {
        Ok(self.list().await)
    }

    async fn save_note(&self, note: Note) -> Result<Vec<Note>, Error> {
        Ok(self.save(note).await?.notes)
    }

    async fn delete_note(&self, id: &str) -> Result<Vec<Note>, Error> {
        Ok(self.delete(id).await?.notes)
    }

    async fn search_notes(&self, query: Option<&str>) -> Result<Vec<Note>, Error> {
        Ok(self.search(query).await)
    }
}

/// Run a single request against `api`.
pub async fn dispatch<A: NotesApi + ?Sized>(api: &A, request: Request) -> Response {
    let result = match request {
        Request::List => api.get_notes().await,
        Request::Save { note } => api.save_note(note).await,
        Request::Delete { id } => api.delete_note(&id).await,
        Request::Search { query } => api.search_notes(query.as_deref()).await,
    };

    match result {
        Ok(notes) => Response::Notes { notes },
        Err(e) => Response::Error {
            error: e.to_string(),
        },
    }
}
