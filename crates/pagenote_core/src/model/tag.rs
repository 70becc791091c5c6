//! Owner-scoped tag record.

use super::item::{OwnerId, TagId};
use serde::{Deserialize, Serialize};

/// Label attachable to the notes and pages of a single owner.
///
/// `(owner_id, name)` is unique in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub uuid: TagId,
    pub owner_id: OwnerId,
    /// Trimmed, case-preserving name.
    pub name: String,
    /// Epoch ms.
    pub created_at: i64,
}

/// Trims one raw tag name; blank input yields `None`.
pub fn normalize_tag_name(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Trims, drops blanks and deduplicates, keeping first-occurrence order.
pub fn distinct_tag_names<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    for value in raw {
        if let Some(name) = normalize_tag_name(value.as_ref()) {
            if seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
        }
    }
    names
}
