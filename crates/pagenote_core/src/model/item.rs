//! Identity and addressing types shared across notes and pages.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identity of the account that owns notes, pages and tags.
pub type OwnerId = Uuid;
/// Stable note identifier.
pub type NoteId = Uuid;
/// Stable page identifier.
pub type PageId = Uuid;
/// Stable tag identifier.
pub type TagId = Uuid;

/// Who is looking at a feed or a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viewer {
    /// Unauthenticated visitor; only shared pages are visible.
    Anonymous,
    /// Authenticated owner.
    Owner(OwnerId),
}

impl Viewer {
    /// Returns the owner id for authenticated viewers.
    pub fn owner_id(&self) -> Option<OwnerId> {
        match self {
            Self::Anonymous => None,
            Self::Owner(id) => Some(*id),
        }
    }
}

/// Kind of top-level item that moves through the trash lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Note,
    Page,
}

impl ItemType {
    /// Parses the wire label (`note` / `page`). `memo` is accepted as an alias.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "note" | "memo" => Some(Self::Note),
            "page" => Some(Self::Page),
            _ => None,
        }
    }

    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Page => "page",
        }
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a textual item/owner identifier.
pub fn parse_uuid_text(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_uuid_text, ItemType, Viewer};
    use uuid::Uuid;

    #[test]
    fn item_type_parses_labels_and_memo_alias() {
        assert_eq!(ItemType::parse("Page"), Some(ItemType::Page));
        assert_eq!(ItemType::parse(" memo "), Some(ItemType::Note));
        assert_eq!(ItemType::parse("block"), None);
    }

    #[test]
    fn viewer_exposes_owner_only_when_authenticated() {
        let id = Uuid::new_v4();
        assert_eq!(Viewer::Owner(id).owner_id(), Some(id));
        assert_eq!(Viewer::Anonymous.owner_id(), None);
        assert!(parse_uuid_text("not-a-uuid").is_none());
    }
}
