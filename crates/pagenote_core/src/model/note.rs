//! Note domain model.
//!
//! # Invariants
//! - A note belongs to exactly one owner and is never public.
//! - `deleted_at` is the source of truth for trash state.

use super::item::{NoteId, OwnerId};
use super::tag::Tag;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\S+)").expect("valid hashtag regex"));
static NON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid tag charset regex"));

/// Default origin label for notes created without one.
pub const DEFAULT_NOTE_SOURCE: &str = "web";

/// Short, untitled, timestamped text entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub uuid: NoteId,
    pub owner_id: OwnerId,
    pub content: String,
    /// Ordered image references.
    pub images: Vec<String>,
    /// Free-form origin label (`mobile`, `web`, ...).
    pub source: String,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms of the last full-replace update.
    pub updated_at: i64,
    /// Epoch ms when moved to trash.
    pub deleted_at: Option<i64>,
    pub tags: Vec<Tag>,
}

impl Note {
    /// Creates an active note with a fresh identity.
    pub fn new(owner_id: OwnerId, content: impl Into<String>, now_ms: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            owner_id,
            content: content.into(),
            images: Vec::new(),
            source: DEFAULT_NOTE_SOURCE.to_string(),
            created_at: now_ms,
            updated_at: now_ms,
            deleted_at: None,
            tags: Vec::new(),
        }
    }

    /// Returns whether this note is outside the trash.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Tag names in association order.
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.name.clone()).collect()
    }
}

/// Extracts `#hashtag` names from note content.
///
/// Everything except letters and digits is stripped from each match; empty
/// results are skipped and duplicates keep their first position.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in HASHTAG_RE.captures_iter(content) {
        let Some(raw) = caps.get(1) else {
            continue;
        };
        let cleaned = NON_WORD_RE.replace_all(raw.as_str(), "");
        if cleaned.is_empty() || names.iter().any(|name| name == cleaned.as_ref()) {
            continue;
        }
        names.push(cleaned.into_owned());
    }
    names
}
