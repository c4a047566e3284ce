//! JSON-lines front end: one request per stdin line, one response per line.
//!
//! The first line written is the `notesLoaded` event.

use anyhow::{Context, Result};
use jotter_core::{dispatch, NoteStorage, NotesStore, Request, Response};
use std::io::{self, BufRead, Write};

use crate::Store;

pub async fn run(store: &Store) -> Result<()> {
    serve(store, io::stdin().lock(), io::stdout().lock()).await
}

/// Answer requests from `input` until it is exhausted.
pub async fn serve<S: NoteStorage>(
    store: &NotesStore<S>,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    if let Some(event) = store.take_loaded_event().await {
        writeln!(output, "{}", serde_json::to_string(&event)?)?;
        output.flush()?;
    }

    for line in input.lines() {
        let line = line.context("Failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                tracing::debug!(?request, "handling request");
                dispatch(store, request).await
            }
            Err(e) => Response::Error {
                error: format!("invalid request: {}", e),
            },
        };

        writeln!(output, "{}", serde_json::to_string(&response)?)?;
        output.flush()?;
    }

    Ok(())
}
