//! Merged note/page timeline.
//!
//! # Responsibility
//! - Fetch the viewer's note and page streams concurrently.
//! - Merge them newest-first and apply the caller's page window.
//!
//! # Invariants
//! - Both fetches settle before any error is reported; there is no partial
//!   feed.
//! - On equal `created_at` the note is placed before the page.
//! - Each source fetches at most `limit * over_fetch_factor` rows from its
//!   start, so `total` counts the merged window, not every stored item. Deep
//!   offsets past that window come back empty.

use super::error::{EngineError, EngineResult};
use crate::config::FeedConfig;
use crate::model::item::Viewer;
use crate::repo::feed_source::{
    NoteFeedEntry, NoteFeedSource, PageFeedEntry, PageFeedSource, SqliteFeedSource,
};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
    Note(NoteFeedEntry),
    Page(PageFeedEntry),
}

impl FeedItem {
    pub fn created_at(&self) -> i64 {
        match self {
            Self::Note(note) => note.created_at,
            Self::Page(page) => page.created_at,
        }
    }
}

/// One page of the merged timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub items: Vec<FeedItem>,
    /// Length of the merged window.
    pub total: usize,
}

/// Timeline aggregator over two independent sources.
pub struct FeedService<N, P> {
    notes: Arc<N>,
    pages: Arc<P>,
    config: FeedConfig,
}

impl FeedService<SqliteFeedSource, SqliteFeedSource> {
    /// Aggregator reading both streams from the database at `db_path`.
    pub fn sqlite(db_path: impl AsRef<Path>, config: FeedConfig) -> Self {
        let source = Arc::new(SqliteFeedSource::new(db_path));
        Self::new(Arc::clone(&source), source, config)
    }
}

impl<N, P> FeedService<N, P>
where
    N: NoteFeedSource + 'static,
    P: PageFeedSource + 'static,
{
    pub fn new(notes: Arc<N>, pages: Arc<P>, config: FeedConfig) -> Self {
        Self {
            notes,
            pages,
            config,
        }
    }

    /// Returns items `[offset, offset + limit)` of the merged timeline.
    ///
    /// Owners see their notes and pages; anonymous viewers see shared pages
    /// only. `limit = 0` falls back to the configured default.
    pub async fn get_timeline(
        &self,
        viewer: Viewer,
        limit: u32,
        offset: u32,
    ) -> EngineResult<Timeline> {
        let started_at = Instant::now();
        let limit = self.config.normalize_limit(limit);
        let window = self.config.fetch_window(limit);
        let max_images = self.config.max_page_images;

        let notes_source = Arc::clone(&self.notes);
        let notes_task = tokio::task::spawn_blocking(move || match viewer {
            Viewer::Owner(owner_id) => notes_source.fetch_notes(owner_id, window, 0),
            Viewer::Anonymous => Ok(Vec::new()),
        });
        let pages_source = Arc::clone(&self.pages);
        let pages_task = tokio::task::spawn_blocking(move || {
            pages_source.fetch_pages(viewer, window, 0, max_images)
        });

        let (notes, pages) = tokio::join!(notes_task, pages_task);
        let notes = settle(notes, "notes");
        let pages = settle(pages, "pages");
        let (notes, pages) = match (notes, pages) {
            (Ok(notes), Ok(pages)) => (notes, pages),
            (Err(err), _) | (_, Err(err)) => {
                warn!(
                    "event=timeline_fetch module=service status=error viewer={} error={}",
                    viewer_label(viewer),
                    err
                );
                return Err(EngineError::from(err));
            }
        };

        let merged = merge_descending(notes, pages);
        let timeline = paginate(merged, limit, offset);
        info!(
            "event=timeline_fetch module=service status=ok viewer={} limit={} offset={} items={} total={} duration_ms={}",
            viewer_label(viewer),
            limit,
            offset,
            timeline.items.len(),
            timeline.total,
            started_at.elapsed().as_millis()
        );
        Ok(timeline)
    }
}

fn settle<T>(joined: Result<RepoResult<T>, JoinError>, branch: &str) -> RepoResult<T> {
    joined.map_err(|err| RepoError::Unavailable(format!("{branch} fetch: {err}")))?
}

fn viewer_label(viewer: Viewer) -> &'static str {
    match viewer {
        Viewer::Anonymous => "anonymous",
        Viewer::Owner(_) => "owner",
    }
}

/// Merges two newest-first lists into one; notes win ties.
pub fn merge_descending(notes: Vec<NoteFeedEntry>, pages: Vec<PageFeedEntry>) -> Vec<FeedItem> {
    let mut merged = Vec::with_capacity(notes.len() + pages.len());
    let mut notes = notes.into_iter().peekable();
    let mut pages = pages.into_iter().peekable();

    loop {
        let take_note = match (notes.peek(), pages.peek()) {
            (Some(note), Some(page)) => note.created_at >= page.created_at,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let item = if take_note {
            notes.next().map(FeedItem::Note)
        } else {
            pages.next().map(FeedItem::Page)
        };
        merged.extend(item);
    }
    merged
}

fn paginate(merged: Vec<FeedItem>, limit: u32, offset: u32) -> Timeline {
    let total = merged.len();
    let items = merged
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    Timeline { items, total }
}

#[cfg(test)]
mod tests {
    use super::{merge_descending, paginate, FeedItem};
    use crate::repo::feed_source::{NoteFeedEntry, PageFeedEntry};
    use uuid::Uuid;

    fn note(created_at: i64) -> NoteFeedEntry {
        NoteFeedEntry {
            id: Uuid::new_v4(),
            content: format!("note {created_at}"),
            images: Vec::new(),
            tags: Vec::new(),
            created_at,
        }
    }

    fn page(created_at: i64) -> PageFeedEntry {
        PageFeedEntry {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: format!("page {created_at}"),
            summary: String::new(),
            cover: String::new(),
            images: Vec::new(),
            tags: Vec::new(),
            share_token: None,
            created_at,
        }
    }

    fn shape(items: &[FeedItem]) -> Vec<(char, i64)> {
        items
            .iter()
            .map(|item| match item {
                FeedItem::Note(entry) => ('n', entry.created_at),
                FeedItem::Page(entry) => ('p', entry.created_at),
            })
            .collect()
    }

    #[test]
    fn merge_interleaves_by_created_at() {
        let merged = merge_descending(vec![note(30), note(20)], vec![page(25), page(10)]);
        assert_eq!(shape(&merged), vec![('n', 30), ('p', 25), ('n', 20), ('p', 10)]);
    }

    #[test]
    fn merge_places_note_first_on_ties() {
        let merged = merge_descending(vec![note(10)], vec![page(10), page(5)]);
        assert_eq!(shape(&merged), vec![('n', 10), ('p', 10), ('p', 5)]);
    }

    #[test]
    fn merge_drains_the_longer_side() {
        let merged = merge_descending(Vec::new(), vec![page(3), page(2)]);
        assert_eq!(shape(&merged), vec![('p', 3), ('p', 2)]);
    }

    #[test]
    fn pagination_past_the_end_is_empty_with_total() {
        let merged = merge_descending(vec![note(30), note(20)], vec![page(25), page(10)]);
        let timeline = paginate(merged, 2, 4);
        assert!(timeline.items.is_empty());
        assert_eq!(timeline.total, 4);
    }

    #[test]
    fn pagination_slices_the_window() {
        let merged = merge_descending(vec![note(30), note(20)], vec![page(25), page(10)]);
        let timeline = paginate(merged, 2, 1);
        assert_eq!(shape(&timeline.items), vec![('p', 25), ('n', 20)]);
    }
}
