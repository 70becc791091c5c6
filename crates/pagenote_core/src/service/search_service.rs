//! Search hit hydration.
//!
//! # Invariants
//! - Output keeps the backend's rank order.
//! - Hits for missing, trashed or foreign items are dropped silently.

use super::error::{EngineError, EngineResult};
use crate::model::item::{ItemType, OwnerId};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::page_repo::{PageRepository, SqlitePageRepository};
use crate::repo::RepoError;
use crate::search::{SearchBackend, SearchError, SearchHit};
use log::debug;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

/// Display row for one search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ItemType,
    /// Page title; empty for notes.
    pub title: String,
    /// Note content; empty for pages.
    pub content: String,
    pub summary: String,
    pub cover: String,
    pub hit_fragment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub query: String,
}

pub struct SearchService<'conn, B: SearchBackend> {
    conn: &'conn Connection,
    backend: B,
}

impl<'conn, B: SearchBackend> SearchService<'conn, B> {
    pub fn new(conn: &'conn Connection, backend: B) -> Self {
        Self { conn, backend }
    }

    pub fn search(
        &self,
        owner_id: OwnerId,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> EngineResult<SearchResponse> {
        if query.trim().is_empty() {
            return Ok(SearchResponse {
                results: Vec::new(),
                total: 0,
                query: query.to_string(),
            });
        }

        let hits = self
            .backend
            .search(owner_id, query, limit, offset)
            .map_err(|err| match err {
                SearchError::InvalidQuery { .. } => EngineError::ValidationFailed(err.to_string()),
                SearchError::Backend(message) => {
                    EngineError::StorageFailure(RepoError::Unavailable(message))
                }
            })?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in &hits {
            if let Some(item) = self.hydrate(owner_id, hit)? {
                results.push(item);
            }
        }
        debug!(
            "event=search module=service status=ok hits={} results={}",
            hits.len(),
            results.len()
        );

        Ok(SearchResponse {
            total: results.len(),
            results,
            query: query.to_string(),
        })
    }

    fn hydrate(&self, owner_id: OwnerId, hit: &SearchHit) -> EngineResult<Option<SearchResultItem>> {
        let item = match hit.item_type {
            ItemType::Note => SqliteNoteRepository::new(self.conn)
                .find_note(hit.id, false)?
                .filter(|note| note.owner_id == owner_id)
                .map(|note| SearchResultItem {
                    id: note.uuid,
                    kind: ItemType::Note,
                    title: String::new(),
                    content: note.content,
                    summary: String::new(),
                    cover: String::new(),
                    hit_fragment: hit.fragment.clone(),
                }),
            ItemType::Page => SqlitePageRepository::new(self.conn)
                .find_page(hit.id, false)?
                .filter(|page| page.owner_id == owner_id)
                .map(|page| SearchResultItem {
                    id: page.uuid,
                    kind: ItemType::Page,
                    title: page.title,
                    content: String::new(),
                    summary: page.summary,
                    cover: page.cover,
                    hit_fragment: hit.fragment.clone(),
                }),
        };
        Ok(item)
    }
}
