//! Preference memory: a bounded log of recently approved posts.
//!
//! [`PreferenceMemory`] is the only entry point the rest of the crate uses.
//! It wraps a [`PreferenceStore`] (JSON file in production, in-memory in
//! tests) and enforces the window: at most `window` entries are kept, the
//! oldest is evicted first, and reads come back most-recent-first.

pub mod store;
pub mod summary;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::platform::Platform;
use crate::types::{DraftOption, DraftStyle, OptionLabel};

pub use self::store::{InMemoryStore, JsonFileStore};
pub use self::summary::{summarize, PreferenceSummary};

/// Default number of approved posts remembered.
pub const DEFAULT_WINDOW: usize = 10;

/// Phrases that mark a caption as telling a personal story.
const PERSONAL_STORY_PHRASES: [&str; 5] = [
    "i remember",
    "i noticed",
    "i've been",
    "the other day",
    "this week",
];

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// One approved post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    /// When the user approved the post.
    pub approved_at: DateTime<Utc>,
    /// Platform the post was written for.
    pub platform: Platform,
    /// Topic the user asked for.
    pub topic: String,
    /// Which option was picked.
    pub label: OptionLabel,
    /// Style of the picked option.
    pub style: DraftStyle,
    /// Content type (feed post, carousel, ...), if known.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Approved caption text.
    pub text: String,
    /// Caption length in words.
    pub word_count: usize,
    /// Number of hashtags in the approved post.
    pub hashtag_count: usize,
    /// Whether the caption opens with a question.
    #[serde(default)]
    pub has_question_hook: bool,
    /// Whether the caption includes a personal anecdote.
    #[serde(default)]
    pub has_personal_story: bool,
    /// Revision instructions given before approval.
    #[serde(default)]
    pub revision_notes: Vec<String>,
}

impl PreferenceEntry {
    /// Build an entry for an approved draft, deriving the text statistics.
    pub fn from_approval(
        platform: Platform,
        topic: &str,
        draft: &DraftOption,
        revision_notes: Vec<String>,
    ) -> Self {
        let text = draft.caption_or_body().trim().to_owned();
        let lower = text.to_lowercase();
        let first_line = text.lines().next().unwrap_or_default().trim();
        Self {
            approved_at: Utc::now(),
            platform,
            topic: topic.trim().to_owned(),
            label: draft.label,
            style: draft.style,
            content_type: draft.content_type.clone(),
            word_count: text.split_whitespace().count(),
            hashtag_count: draft.hashtags.len(),
            has_question_hook: first_line.ends_with('?'),
            has_personal_story: PERSONAL_STORY_PHRASES.iter().any(|p| lower.contains(p)),
            revision_notes,
            text,
        }
    }

    /// First `max_chars` characters of the text, on one line.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            return flat;
        }
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Preference storage errors.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Filesystem failure.
    #[error("preference store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored log is not valid JSON.
    #[error("preference store is corrupt: {0}")]
    Corrupt(String),

    /// Serialising entries failed.
    #[error("failed to serialise preferences: {0}")]
    Serialize(String),
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Durable append-and-trim log of approved posts.
///
/// Implementations must make `append` atomic: a concurrent reader sees the log
/// either before or after the new entry, never a partial write.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Append an entry, evicting the oldest beyond the store capacity.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError`] when the log cannot be read or written.
    async fn append(&self, entry: PreferenceEntry) -> Result<(), MemoryError>;

    /// Up to `n` entries, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError`] when the log cannot be read.
    async fn read_recent(&self, n: usize) -> Result<Vec<PreferenceEntry>, MemoryError>;
}

// ---------------------------------------------------------------------------
// Memory facade
// ---------------------------------------------------------------------------

/// Window-bounded view over a [`PreferenceStore`].
#[derive(Clone)]
pub struct PreferenceMemory {
    store: Arc<dyn PreferenceStore>,
    window: usize,
}

impl PreferenceMemory {
    /// Wrap a store with the given window size (clamped to at least 1).
    pub fn new(store: Arc<dyn PreferenceStore>, window: usize) -> Self {
        Self {
            store,
            window: window.max(1),
        }
    }

    /// An in-memory memory with the default window, for tests and dry runs.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new(DEFAULT_WINDOW)), DEFAULT_WINDOW)
    }

    /// Configured window size.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Record an approved post.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError`] when the store write fails.
    pub async fn record(&self, entry: PreferenceEntry) -> Result<(), MemoryError> {
        let platform = entry.platform;
        let label = entry.label;
        self.store.append(entry).await?;
        info!(platform = %platform, label = %label, "preference recorded");
        Ok(())
    }

    /// The current window, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError`] when the store read fails.
    pub async fn recent(&self) -> Result<Vec<PreferenceEntry>, MemoryError> {
        let entries = self.store.read_recent(self.window).await?;
        debug!(count = entries.len(), "preference window read");
        Ok(entries)
    }
}
