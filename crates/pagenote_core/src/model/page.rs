//! Page domain model.
//!
//! # Invariants
//! - A share token, when present, is unique across all pages.
//! - Disabling sharing drops the token; re-enabling issues a new one.

use super::item::{OwnerId, PageId};
use super::tag::Tag;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sharing state of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Sharing {
    Private,
    Shared { token: String },
}

impl Sharing {
    /// Generates a fresh shared state with a new random token.
    pub fn shared_with_new_token() -> Self {
        Self::Shared {
            token: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Private => None,
            Self::Shared { token } => Some(token.as_str()),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared { .. })
    }
}

/// Titled, block-structured document. Blocks are stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub uuid: PageId,
    pub owner_id: OwnerId,
    pub title: String,
    pub cover: String,
    /// Derived from the first paragraph block at last write.
    pub summary: String,
    pub sharing: Sharing,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
    /// Epoch ms when moved to trash.
    pub deleted_at: Option<i64>,
    pub tags: Vec<Tag>,
}

impl Page {
    /// Creates a private, active page with a fresh identity.
    pub fn new(owner_id: OwnerId, title: impl Into<String>, now_ms: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            cover: String::new(),
            summary: String::new(),
            sharing: Sharing::Private,
            created_at: now_ms,
            updated_at: now_ms,
            deleted_at: None,
            tags: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.name.clone()).collect()
    }
}
