use serde::{Deserialize, Serialize};

/// Title stored for notes saved with a blank title.
pub const UNTITLED: &str = "Untitled Note";

/// Preview shown for notes with no content.
pub const NO_CONTENT: &str = "No content";

/// A note as exchanged with the front end and stored on disk.
///
/// `id` is `None` only for an unsaved draft. Timestamps are ISO-8601 strings
/// and are owned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A single-line view of a note for list rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub updated_at: Option<String>,
}

impl Note {
    /// A fresh, unsaved note.
    pub fn draft() -> Self {
        Self::default()
    }

    /// Build a draft with the given fields.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_none()
    }

    /// True when both title and content are empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    /// Title as displayed, falling back to [`UNTITLED`].
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// The most relevant timestamp for display.
    pub fn last_touched(&self) -> Option<&str> {
        self.updated_at.as_deref().or(self.created_at.as_deref())
    }

    /// Case-insensitive substring match on title or content.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }

    /// Convert to summary with a truncated single-line content preview.
    pub fn to_summary(&self, max_len: usize) -> NoteSummary {
        // Convert newlines to spaces and take first max_len characters
        let normalized: String = self
            .content
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let trimmed = normalized.trim();

        let preview = if trimmed.is_empty() {
            NO_CONTENT.to_string()
        } else if trimmed.chars().count() > max_len {
            let head: String = trimmed.chars().take(max_len).collect();
            format!("{}...", head.trim_end())
        } else {
            trimmed.to_string()
        };

        NoteSummary {
            id: self.id.clone().unwrap_or_default(),
            title: self.display_title().to_string(),
            preview,
            updated_at: self.last_touched().map(str::to_string),
        }
    }
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
