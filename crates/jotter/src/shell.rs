//! Interactive line editor driving an [`EditorSession`].

use anyhow::{Context, Result};
use chrono::Utc;
use jotter_core::{EditorSession, Mode, StatusKind};
use std::io::{self, BufRead, Write};

use crate::{print_note, Store};

const HELP: &str = "\
Commands:
  ls                 list notes (search results while searching)
  new                start a new note
  open <id>          open a note
  title <text>       set the title
  content <text>     replace the content
  append <text>      add a line to the content
  show               print the note being edited
  save               save the note being edited
  delete             delete the note being edited
  search <text>      filter the list
  clear              clear the search
  quit               leave";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    List,
    New,
    Open(String),
    Title(String),
    Content(String),
    Append(String),
    Show,
    Save,
    Delete,
    Search(String),
    Clear,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "ls" | "list" => Command::List,
        "new" => Command::New,
        "open" if !rest.is_empty() => Command::Open(rest.to_string()),
        "open" => return Err("usage: open <id>".to_string()),
        "title" => Command::Title(rest.to_string()),
        "content" => Command::Content(rest.to_string()),
        "append" => Command::Append(rest.to_string()),
        "show" => Command::Show,
        "save" => Command::Save,
        "delete" | "rm" => Command::Delete,
        "search" => Command::Search(rest.to_string()),
        "clear" => Command::Clear,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(command)
}

fn print_list(session: &EditorSession) {
    let items = session.list_items(Utc::now());
    if items.is_empty() {
        println!("  (no notes)");
        return;
    }
    for item in items {
        let marker = if item.active { '*' } else { ' ' };
        println!(
            "{} {}: {} ({}) -- {}",
            marker, item.summary.id, item.summary.title, item.date, item.summary.preview
        );
    }
}

fn print_status(session: &EditorSession) {
    let kind = match session.status().kind {
        StatusKind::Info => "",
        StatusKind::Modified => " [modified]",
        StatusKind::Error => " [error]",
    };
    let mode = match session.mode() {
        Mode::Drafting => "draft",
        Mode::Editing => "editing",
    };
    println!(
        "{}{} ({}, {} words)",
        session.status().message,
        kind,
        mode,
        session.word_count()
    );
}

fn confirm(prompt: &str, lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => {
            let line = line.context("Failed to read input")?;
            Ok(matches!(line.trim(), "y" | "Y" | "yes"))
        }
        None => Ok(false),
    }
}

pub async fn run(store: &Store) -> Result<()> {
    let mut session = EditorSession::new();
    if let Some(event) = store.take_loaded_event().await {
        session.handle_event(event);
    }

    println!("jotter shell, 'help' for commands");
    print_list(&session);
    print_status(&session);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line.context("Failed to read input")?,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        // Store errors are already reflected in the status line.
        match command {
            Command::List => print_list(&session),
            Command::New => session.new_note(),
            Command::Open(id) => {
                if !session.select(&id) {
                    println!("Note {} not found", id);
                }
            }
            Command::Title(title) => session.set_title(title),
            Command::Content(content) => session.set_content(content),
            Command::Append(text) => {
                let mut content = session.current().content.clone();
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&text);
                session.set_content(content);
            }
            Command::Show => print_note(session.current()),
            Command::Save => {
                if let Err(e) = session.save(store).await {
                    tracing::warn!(error = %e, "save failed");
                }
            }
            Command::Delete => {
                if session.mode() == Mode::Drafting {
                    println!("Nothing to delete: the note has not been saved");
                    continue;
                }
                if confirm("Delete this note?", &mut lines)? {
                    if let Err(e) = session.delete(store).await {
                        tracing::warn!(error = %e, "delete failed");
                    }
                }
            }
            Command::Search(query) => {
                if let Err(e) = session.search(store, &query).await {
                    tracing::warn!(error = %e, "search failed");
                }
                print_list(&session);
            }
            Command::Clear => {
                session.clear_search();
                print_list(&session);
            }
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Quit => break,
        }

        print_status(&session);
    }

    if store.is_dirty().await {
        eprintln!("Warning: some changes could not be written to disk");
    }

    Ok(())
}
