use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::datefmt::now_iso;
use crate::{Error, Event, Note, NoteStorage, UNTITLED};

/// What `save` does with a note whose id is not in the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingNotePolicy {
    /// Leave the collection unchanged and report [`SaveOutcome::Missing`].
    #[default]
    Ignore,
    /// Fail with [`Error::NotFound`].
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub missing_note: MissingNotePolicy,
}

/// How a save was applied to the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(String),
    Updated(String),
    Missing(String),
}

impl SaveOutcome {
    pub fn id(&self) -> &str {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) | SaveOutcome::Missing(id) => id,
        }
    }
}

/// Result of a save: the whole collection after the upsert.
#[derive(Debug, Clone)]
pub struct Saved {
    pub notes: Vec<Note>,
    pub outcome: SaveOutcome,
}

/// Result of a delete: the whole collection after the removal.
#[derive(Debug, Clone)]
pub struct Deleted {
    pub notes: Vec<Note>,
    pub removed: bool,
}

struct State {
    notes: Vec<Note>,
    /// Set when the last write failed and memory is ahead of storage.
    dirty: bool,
}

/// The authoritative notes collection, synchronized to a [`NoteStorage`].
///
/// Every mutation holds the state lock across both the in-memory change and
/// the write, so only one mutation is ever in flight and writes never
/// interleave.
pub struct NotesStore<S: NoteStorage> {
    storage: S,
    config: StoreConfig,
    state: Mutex<State>,
    announced: AtomicBool,
}

impl<S: NoteStorage> NotesStore<S> {
    /// Load the collection from `storage`.
    ///
    /// Unreadable or corrupt storage yields an empty collection.
    pub async fn open(storage: S, config: StoreConfig) -> Self {
        let notes = match storage.load().await {
            Ok(notes) => sanitize(notes),
            Err(e) => {
                warn!(error = %e, "could not load notes, starting with an empty collection");
                Vec::new()
            }
        };
        debug!(count = notes.len(), "notes loaded");

        Self {
            storage,
            config,
            state: Mutex::new(State {
                notes,
                dirty: false,
            }),
            announced: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The startup notification for the front end. Returns `Some` only once.
    pub async fn take_loaded_event(&self) -> Option<Event> {
        if self.announced.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(Event::NotesLoaded {
            notes: self.list().await,
        })
    }

    /// The full collection, newest first.
    pub async fn list(&self) -> Vec<Note> {
        self.state.lock().await.notes.clone()
    }

    /// Get a note by ID.
    pub async fn get(&self, id: &str) -> Option<Note> {
        let state = self.state.lock().await;
        state.notes.iter().find(|n| n.has_id(id)).cloned()
    }

    /// Create or update a note, persist, and return the whole collection.
    ///
    /// A note without an id gets a fresh id and both timestamps and goes to
    /// the front. A note with a known id replaces that entry in place; its
    /// stored `createdAt` is kept and `updatedAt` refreshed. Blank titles are
    /// stored as [`UNTITLED`].
    pub async fn save(&self, note: Note) -> Result<Saved, Error> {
        let mut state = self.state.lock().await;
        let now = now_iso();
        let title = if note.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            note.title
        };

        let outcome = match note.id {
            Some(id) => match state.notes.iter().position(|n| n.has_id(&id)) {
                Some(index) => {
                    let created_at = state.notes[index]
                        .created_at
                        .clone()
                        .or(note.created_at)
                        .or_else(|| Some(now.clone()));
                    state.notes[index] = Note {
                        id: Some(id.clone()),
                        title,
                        content: note.content,
                        created_at,
                        updated_at: Some(now),
                    };
                    SaveOutcome::Updated(id)
                }
                None => {
                    if self.config.missing_note == MissingNotePolicy::Reject {
                        return Err(Error::NotFound(format!("note {}", id)));
                    }
                    debug!(id = %id, "save for unknown note left the collection unchanged");
                    SaveOutcome::Missing(id)
                }
            },
            None => {
                let id = new_id(&state.notes);
                state.notes.insert(
                    0,
                    Note {
                        id: Some(id.clone()),
                        title,
                        content: note.content,
                        created_at: Some(now.clone()),
                        updated_at: Some(now),
                    },
                );
                SaveOutcome::Created(id)
            }
        };

        self.persist(&mut state).await?;

        Ok(Saved {
            notes: state.notes.clone(),
            outcome,
        })
    }

    /// Remove the note with `id` (if any), persist, and return the collection.
    pub async fn delete(&self, id: &str) -> Result<Deleted, Error> {
        let mut state = self.state.lock().await;
        let before = state.notes.len();
        state.notes.retain(|n| !n.has_id(id));
        let removed = state.notes.len() < before;

        self.persist(&mut state).await?;

        Ok(Deleted {
            notes: state.notes.clone(),
            removed,
        })
    }

    /// Notes whose title or content contains `query`, ignoring case.
    ///
    /// An empty or absent query returns the full collection.
    pub async fn search(&self, query: Option<&str>) -> Vec<Note> {
        let state = self.state.lock().await;
        match query {
            None | Some("") => state.notes.clone(),
            Some(query) => {
                let needle = query.to_lowercase();
                state
                    .notes
                    .iter()
                    .filter(|n| n.matches(&needle))
                    .cloned()
                    .collect()
            }
        }
    }

    /// Write the current collection again, e.g. after a failed write.
    pub async fn flush(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        self.persist(&mut state).await
    }

    /// Whether memory has diverged from storage after a failed write.
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    async fn persist(&self, state: &mut State) -> Result<(), Error> {
        match self.storage.persist(&state.notes).await {
            Ok(()) => {
                state.dirty = false;
                debug!(count = state.notes.len(), "notes persisted");
                Ok(())
            }
            Err(e) => {
                state.dirty = true;
                error!(error = %e, "failed to persist notes, keeping in-memory changes");
                Err(Error::Persist(e.to_string()))
            }
        }
    }
}

/// Drop entries that would break id uniqueness.
fn sanitize(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::new();
    notes
        .into_iter()
        .filter(|note| match note.id.as_deref() {
            Some(id) if seen.insert(id.to_string()) => true,
            Some(id) => {
                warn!(id, "dropping stored note with duplicate id");
                false
            }
            None => {
                warn!("dropping stored note without an id");
                false
            }
        })
        .collect()
}

fn new_id(notes: &[Note]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !notes.iter().any(|n| n.has_id(&id)) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use std::sync::Arc;
    use std::time::Duration;

    async fn open_empty() -> NotesStore<MemoryStorage> {
        NotesStore::open(MemoryStorage::new(), StoreConfig::default()).await
    }

    fn stored(id: &str, title: &str, content: &str) -> Note {
        Note {
            id: Some(id.to_string()),
            title: title.to_string(),
            content: content.to_string(),
            created_at: Some("2024-01-01T00:00:00.000Z".to_string()),
            updated_at: Some("2024-01-01T00:00:00.000Z".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = open_empty().await;

        let saved = store.save(Note::new("A", "x")).await.unwrap();
        let id = match &saved.outcome {
            SaveOutcome::Created(id) => id.clone(),
            other => panic!("expected Created, got {:?}", other),
        };

        let notes = store.list().await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id.as_deref(), Some(id.as_str()));
        assert_eq!(notes[0].title, "A");
        assert_eq!(notes[0].content, "x");
        assert!(notes[0].created_at.is_some());
        assert_eq!(notes[0].created_at, notes[0].updated_at);
        assert_eq!(saved.notes, notes);
    }

    #[tokio::test]
    async fn test_create_inserts_at_front_with_unique_ids() {
        let store = open_empty().await;

        store.save(Note::new("first", "")).await.unwrap();
        store.save(Note::new("second", "")).await.unwrap();
        let saved = store.save(Note::new("third", "")).await.unwrap();

        let titles: Vec<_> = saved.notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);

        let ids: HashSet<_> = saved.notes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_blank_title_defaults() {
        let store = open_empty().await;
        let saved = store.save(Note::new("   ", "body")).await.unwrap();
        assert_eq!(saved.notes[0].title, UNTITLED);
    }

    #[tokio::test]
    async fn test_update_in_place_keeps_created_at() {
        let store = NotesStore::open(
            MemoryStorage::with_notes(vec![
                stored("1", "one", "a"),
                stored("2", "two", "b"),
                stored("3", "three", "c"),
            ]),
            StoreConfig::default(),
        )
        .await;

        let mut edited = store.get("2").await.unwrap();
        edited.title = "two, edited".to_string();
        edited.created_at = Some("1999-01-01T00:00:00.000Z".to_string());

        let saved = store.save(edited).await.unwrap();
        assert_eq!(saved.outcome, SaveOutcome::Updated("2".to_string()));
        assert_eq!(saved.notes.len(), 3);
        assert_eq!(saved.notes[1].title, "two, edited");
        assert_eq!(
            saved.notes[1].created_at.as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
        assert_ne!(
            saved.notes[1].updated_at.as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
        assert_eq!(saved.notes[0], stored("1", "one", "a"));
        assert_eq!(saved.notes[2], stored("3", "three", "c"));
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let store = open_empty().await;
        let created = store.save(Note::new("A", "x")).await.unwrap();
        let first = created.notes[0].clone();

        std::thread::sleep(Duration::from_millis(5));

        let mut edited = first.clone();
        edited.content = "y".to_string();
        let saved = store.save(edited).await.unwrap();

        assert_eq!(saved.notes[0].created_at, first.created_at);
        assert!(saved.notes[0].updated_at > first.updated_at);
        assert_eq!(saved.notes[0].content, "y");
    }

    #[tokio::test]
    async fn test_save_unknown_id_is_noop_by_default() {
        let storage = MemoryStorage::with_notes(vec![stored("1", "one", "a")]);
        let store = NotesStore::open(storage, StoreConfig::default()).await;

        let saved = store.save(stored("gone", "ghost", "boo")).await.unwrap();
        assert_eq!(saved.outcome, SaveOutcome::Missing("gone".to_string()));
        assert_eq!(saved.notes, vec![stored("1", "one", "a")]);
        // The collection is still written, matching a successful save.
        assert_eq!(store.storage().write_count(), 1);
    }

    #[tokio::test]
    async fn test_save_unknown_id_rejected_when_strict() {
        let storage = MemoryStorage::with_notes(vec![stored("1", "one", "a")]);
        let config = StoreConfig {
            missing_note: MissingNotePolicy::Reject,
        };
        let store = NotesStore::open(storage, config).await;

        let err = store.save(stored("gone", "ghost", "boo")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.list().await, vec![stored("1", "one", "a")]);
        assert_eq!(store.storage().write_count(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = MemoryStorage::with_notes(vec![stored("1", "one", "a"), stored("2", "two", "b")]);
        let store = NotesStore::open(storage, StoreConfig::default()).await;

        let deleted = store.delete("1").await.unwrap();
        assert!(deleted.removed);
        assert_eq!(deleted.notes, vec![stored("2", "two", "b")]);
        assert_eq!(store.storage().snapshot(), vec![stored("2", "two", "b")]);

        let deleted = store.delete("1").await.unwrap();
        assert!(!deleted.removed);
        assert_eq!(deleted.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_search() {
        let storage = MemoryStorage::with_notes(vec![
            stored("1", "Groceries", "eggs, milk"),
            stored("2", "Ideas", "Build a MILK bar"),
            stored("3", "Todo", "call mum"),
        ]);
        let store = NotesStore::open(storage, StoreConfig::default()).await;

        let ids = |notes: Vec<Note>| -> Vec<String> {
            notes.into_iter().filter_map(|n| n.id).collect()
        };

        assert_eq!(ids(store.search(Some("milk")).await), vec!["1", "2"]);
        assert_eq!(ids(store.search(Some("GROC")).await), vec!["1"]);
        assert!(store.search(Some("zebra")).await.is_empty());

        let first = store.search(Some("m")).await;
        let second = store.search(Some("m")).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_search_empty_is_list() {
        let storage = MemoryStorage::with_notes(vec![stored("1", "a", ""), stored("2", "b", "")]);
        let store = NotesStore::open(storage, StoreConfig::default()).await;

        let all = store.list().await;
        assert_eq!(store.search(None).await, all);
        assert_eq!(store.search(Some("")).await, all);
    }

    #[tokio::test]
    async fn test_scenario() {
        let store = open_empty().await;

        let saved = store.save(Note::new("A", "x")).await.unwrap();
        let id1 = saved.outcome.id().to_string();
        assert_eq!(saved.notes.len(), 1);

        let saved = store.save(Note::new("B", "y")).await.unwrap();
        let id2 = saved.outcome.id().to_string();
        let titles: Vec<_> = saved.notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);

        let deleted = store.delete(&id1).await.unwrap();
        assert_eq!(deleted.notes.len(), 1);
        assert!(deleted.notes[0].has_id(&id2));

        let found = store.search(Some("y")).await;
        assert_eq!(found.len(), 1);
        assert!(found[0].has_id(&id2));

        assert!(store.search(Some("z")).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_storage_loads_empty() {
        let store = NotesStore::open(MemoryStorage::corrupt(), StoreConfig::default()).await;
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_drops_invalid_entries() {
        let storage = MemoryStorage::with_notes(vec![
            stored("1", "one", ""),
            Note::new("draft", ""),
            stored("1", "duplicate", ""),
            stored("2", "two", ""),
        ]);
        let store = NotesStore::open(storage, StoreConfig::default()).await;

        let titles: Vec<_> = store.list().await.into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_and_reports() {
        let store = open_empty().await;
        store.storage().set_fail_writes(true);

        let err = store.save(Note::new("A", "x")).await.unwrap_err();
        assert!(matches!(err, Error::Persist(_)));

        // Not rolled back
        assert_eq!(store.list().await.len(), 1);
        assert!(store.is_dirty().await);
        assert!(store.storage().snapshot().is_empty());

        assert!(matches!(store.flush().await, Err(Error::Persist(_))));

        store.storage().set_fail_writes(false);
        store.flush().await.unwrap();
        assert!(!store.is_dirty().await);
        assert_eq!(store.storage().snapshot(), store.list().await);
    }

    #[tokio::test]
    async fn test_loaded_event_is_one_shot() {
        let storage = MemoryStorage::with_notes(vec![stored("1", "one", "")]);
        let store = NotesStore::open(storage, StoreConfig::default()).await;

        match store.take_loaded_event().await {
            Some(Event::NotesLoaded { notes }) => assert_eq!(notes.len(), 1),
            None => panic!("expected a loaded event"),
        }
        assert!(store.take_loaded_event().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_are_serialized() {
        let store = Arc::new(open_empty().await);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .save(Note::new(format!("Note {}", i), "body"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let notes = store.list().await;
        assert_eq!(notes.len(), 20);
        let ids: HashSet<_> = notes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids.len(), 20);

        // The last write reflects every mutation.
        assert_eq!(store.storage().snapshot(), notes);
        assert_eq!(store.storage().write_count(), 20);
    }
}
