//! Timeline feed sources.
//!
//! # Responsibility
//! - Produce newest-first note and page rows for one viewer, already shaped
//!   for the timeline.
//!
//! # Invariants
//! - Sources are `Send + Sync` so the aggregator can run them on separate
//!   blocking workers.
//! - The SQLite source never shares a connection between calls.

use super::block_repo::{BlockRepository, SqliteBlockRepository};
use super::note_repo::{NoteRepository, SqliteNoteRepository};
use super::page_repo::{PageRepository, SqlitePageRepository};
use super::RepoResult;
use crate::db::open_db;
use crate::model::block::extract_image_urls;
use crate::model::item::{NoteId, OwnerId, PageId, Viewer};
use crate::model::note::Note;
use crate::model::page::Page;
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Note row as rendered on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteFeedEntry {
    pub id: NoteId,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: i64,
}

/// Page row as rendered on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFeedEntry {
    pub id: PageId,
    pub owner_id: OwnerId,
    pub title: String,
    pub summary: String,
    pub cover: String,
    /// Up to the configured number of image URLs from the page's blocks.
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub share_token: Option<String>,
    pub created_at: i64,
}

impl From<Note> for NoteFeedEntry {
    fn from(note: Note) -> Self {
        Self {
            id: note.uuid,
            tags: note.tag_names(),
            content: note.content,
            images: note.images,
            created_at: note.created_at,
        }
    }
}

impl PageFeedEntry {
    /// Shapes a page header plus the image URLs taken from its blocks.
    pub fn from_page(page: Page, images: Vec<String>) -> Self {
        Self {
            id: page.uuid,
            owner_id: page.owner_id,
            images,
            tags: page.tag_names(),
            share_token: page.sharing.token().map(str::to_string),
            title: page.title,
            summary: page.summary,
            cover: page.cover,
            created_at: page.created_at,
        }
    }
}

/// Newest-first note stream of one owner.
pub trait NoteFeedSource: Send + Sync {
    fn fetch_notes(&self, owner_id: OwnerId, limit: u32, offset: u32)
        -> RepoResult<Vec<NoteFeedEntry>>;
}

/// Newest-first page stream visible to a viewer.
///
/// Owners see their own pages; anonymous viewers see every shared page.
pub trait PageFeedSource: Send + Sync {
    fn fetch_pages(
        &self,
        viewer: Viewer,
        limit: u32,
        offset: u32,
        max_images: usize,
    ) -> RepoResult<Vec<PageFeedEntry>>;
}

/// Feed source that opens a fresh connection to `db_path` per fetch.
#[derive(Debug, Clone)]
pub struct SqliteFeedSource {
    db_path: PathBuf,
}

impl SqliteFeedSource {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl NoteFeedSource for SqliteFeedSource {
    fn fetch_notes(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<NoteFeedEntry>> {
        let conn = open_db(&self.db_path)?;
        let notes = SqliteNoteRepository::new(&conn).list_notes_by_owner(owner_id, limit, offset)?;
        Ok(notes.into_iter().map(NoteFeedEntry::from).collect())
    }
}

impl PageFeedSource for SqliteFeedSource {
    fn fetch_pages(
        &self,
        viewer: Viewer,
        limit: u32,
        offset: u32,
        max_images: usize,
    ) -> RepoResult<Vec<PageFeedEntry>> {
        let conn = open_db(&self.db_path)?;
        let pages_repo = SqlitePageRepository::new(&conn);
        let pages = match viewer {
            Viewer::Owner(owner_id) => pages_repo.list_pages_by_owner(owner_id, limit, offset)?,
            Viewer::Anonymous => pages_repo.list_public_pages(limit, offset)?,
        };

        page_entries(&conn, pages, max_images)
    }
}

/// Shapes pages for a feed; one block lookup per page.
pub(crate) fn page_entries(
    conn: &Connection,
    pages: Vec<Page>,
    max_images: usize,
) -> RepoResult<Vec<PageFeedEntry>> {
    let blocks_repo = SqliteBlockRepository::new(conn);
    let mut entries = Vec::with_capacity(pages.len());
    for page in pages {
        let blocks = blocks_repo.list_page_blocks(page.uuid)?;
        let images = extract_image_urls(&blocks, max_images);
        entries.push(PageFeedEntry::from_page(page, images));
    }
    Ok(entries)
}
