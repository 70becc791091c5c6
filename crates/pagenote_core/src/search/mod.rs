//! Search collaborator boundary.
//!
//! # Responsibility
//! - Define the contract of an external ranked-search backend.
//! - Keep the hit shape independent of how retrieval is executed.
//!
//! Retrieval itself (indexing, ranking, highlighting) lives outside the
//! core; [`crate::service::search_service`] only hydrates the hits.

use crate::model::item::{ItemType, OwnerId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Query text cannot be handled by the backend.
    InvalidQuery { query: String, message: String },
    /// Backend failed to answer.
    Backend(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid search query `{query}`: {message}")
            }
            Self::Backend(message) => write!(f, "search backend failed: {message}"),
        }
    }
}

impl Error for SearchError {}

/// One ranked hit as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub item_type: ItemType,
    pub id: Uuid,
    /// Highlighted fragment; may be empty.
    #[serde(default)]
    pub fragment: String,
}

/// Ranked search over one owner's notes and pages.
///
/// Hits come back best first. They may reference items that were trashed or
/// purged since indexing.
pub trait SearchBackend {
    fn search(
        &self,
        owner_id: OwnerId,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> SearchResult<Vec<SearchHit>>;
}

impl<B: SearchBackend + ?Sized> SearchBackend for &B {
    fn search(
        &self,
        owner_id: OwnerId,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> SearchResult<Vec<SearchHit>> {
        (**self).search(owner_id, query, limit, offset)
    }
}
