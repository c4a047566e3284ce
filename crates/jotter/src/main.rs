//! Jotter CLI - small local notes backed by a single JSON file.

mod rpc;
mod shell;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use jotter_core::datefmt::humanize;
use jotter_core::{MissingNotePolicy, Note, NotesStore, SaveOutcome, StoreConfig};
use jotter_files::JsonFileStorage;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "jotter";

pub(crate) type Store = NotesStore<JsonFileStorage>;

#[derive(Parser)]
#[command(name = "jotter", about = "Small local notes backed by a JSON file", version)]
struct Cli {
    /// Directory holding notes.json (defaults to the per-user data directory)
    #[arg(long, env = "JOTTER_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Fail when saving a note whose id no longer exists
    #[arg(long, env = "JOTTER_STRICT", global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes, newest first
    Ls,
    /// Show a note
    Show {
        /// Note ID
        id: String,
    },
    /// Add a new note
    Add {
        /// Note title
        #[arg(long, default_value = "")]
        title: String,
        /// Note content (reads from stdin if not provided)
        #[arg(long)]
        content: Option<String>,
    },
    /// Edit a note
    Edit {
        /// Note ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content (reads from stdin if not provided and stdin is not a tty)
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a note
    Rm {
        /// Note ID
        id: String,
    },
    /// Search titles and contents, ignoring case
    Search {
        /// Text to look for (lists everything when omitted)
        query: Option<String>,
    },
    /// Serve JSON requests on stdin, one per line
    Rpc,
    /// Interactive editor
    Shell,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Resolve the data directory from flags/env, or the platform default.
fn resolve_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .context("Could not determine a data directory; pass --data-dir"),
    }
}

async fn open_store(data_dir: Option<PathBuf>, strict: bool) -> Result<Store> {
    let dir = resolve_data_dir(data_dir)?;
    let storage = JsonFileStorage::open(&dir).context("Failed to open notes storage")?;
    tracing::debug!(path = %storage.path().display(), "using notes file");

    let config = StoreConfig {
        missing_note: if strict {
            MissingNotePolicy::Reject
        } else {
            MissingNotePolicy::Ignore
        },
    };
    Ok(NotesStore::open(storage, config).await)
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}

/// Replacement content piped to `edit`. Empty input means none was given.
fn content_from(mut reader: impl Read) -> Result<Option<String>> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    if buf.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}

fn is_stdin_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}

pub(crate) fn print_list(notes: &[Note]) {
    let now = Utc::now();
    for note in notes {
        let summary = note.to_summary(80);
        let date = note
            .last_touched()
            .and_then(|ts| humanize(ts, now))
            .unwrap_or_default();
        println!(
            "{}: {} ({}) -- {}",
            summary.id, summary.title, date, summary.preview
        );
    }
}

pub(crate) fn print_note(note: &Note) {
    println!("# {}\n", note.display_title());
    println!("{}", note.content);
    println!("\n---\n");
    println!("ID: {}", note.id.as_deref().unwrap_or("(unsaved)"));
    if let Some(created_at) = &note.created_at {
        println!("Created: {}", created_at);
    }
    if let Some(updated_at) = &note.updated_at {
        println!("Last modified: {}", updated_at);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let store = open_store(cli.data_dir, cli.strict).await?;

    match cli.command {
        Commands::Ls => {
            print_list(&store.list().await);
        }

        Commands::Show { id } => match store.get(&id).await {
            Some(note) => print_note(&note),
            None => bail!("Note {} not found", id),
        },

        Commands::Add { title, content } => {
            let content = match content {
                Some(c) => c,
                None => read_stdin()?,
            };
            let note = Note::new(title, content);
            if note.is_blank() {
                bail!("Cannot save empty note");
            }
            let saved = store.save(note).await?;
            println!("Added note {}", saved.outcome.id());
        }

        Commands::Edit { id, title, content } => {
            let content = if content.is_none() && !is_stdin_tty() {
                content_from(io::stdin())?
            } else {
                content
            };

            if title.is_none() && content.is_none() {
                bail!("Nothing to update");
            }

            let mut note = match store.get(&id).await {
                Some(note) => note,
                None => bail!("Note {} not found", id),
            };
            if let Some(title) = title {
                note.title = title;
            }
            if let Some(content) = content {
                note.content = content;
            }

            match store.save(note).await?.outcome {
                SaveOutcome::Updated(id) => println!("Edited note {}", id),
                SaveOutcome::Missing(id) => bail!("Note {} not found", id),
                SaveOutcome::Created(id) => println!("Added note {}", id),
            }
        }

        Commands::Rm { id } => {
            if store.delete(&id).await?.removed {
                println!("Deleted note {}", id);
            } else {
                bail!("Note {} not found", id);
            }
        }

        Commands::Search { query } => {
            let notes = store.search(query.as_deref()).await;
            print_list(&notes);
        }

        Commands::Rpc => rpc::run(&store).await?,

        Commands::Shell => shell::run(&store).await?,
    }

    Ok(())
}
