//! Tag resolution and owner-scoped tag management.
//!
//! # Responsibility
//! - Turn raw tag name lists into persisted tag records of one owner.
//! - List and delete an owner's tags.
//! - Show the active notes and pages filed under one tag.
//!
//! # Invariants
//! - One tag per distinct, trimmed, non-blank name, returned in the order the
//!   names first appear in the input.
//! - The same `(owner, name)` always resolves to the same tag identity.
//! - Resolution runs on the caller's connection or transaction, so a caller
//!   rollback also reverts tags created here.
//! - Tag timelines never show trashed items or items of another owner.

use super::error::{EngineError, EngineResult};
use super::feed_service::{FeedItem, Timeline};
use crate::config::FeedConfig;
use crate::model::item::{OwnerId, TagId};
use crate::model::tag::{distinct_tag_names, normalize_tag_name, Tag};
use crate::repo::feed_source::{page_entries, NoteFeedEntry};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::page_repo::{PageRepository, SqlitePageRepository};
use crate::repo::tag_repo::{SqliteTagRepository, TagRepository};
use log::{debug, info};
use rusqlite::Connection;
use std::collections::HashMap;

/// Find-or-create resolver over a tag repository.
pub struct TagResolver<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TagResolver<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Resolves `raw_names` for `owner_id`, creating missing tags at `now_ms`.
    pub fn resolve<S: AsRef<str>>(
        &self,
        owner_id: OwnerId,
        raw_names: &[S],
        now_ms: i64,
    ) -> EngineResult<Vec<Tag>> {
        let names = distinct_tag_names(raw_names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_name: HashMap<String, Tag> = self
            .repo
            .find_or_create_batch(owner_id, &names, now_ms)?
            .into_iter()
            .map(|tag| (tag.name.clone(), tag))
            .collect();

        let mut resolved = Vec::with_capacity(names.len());
        for name in &names {
            let tag = by_name.remove(name).ok_or_else(|| {
                EngineError::StorageFailure(crate::repo::RepoError::InvalidData(format!(
                    "tag `{name}` was not resolved"
                )))
            })?;
            resolved.push(tag);
        }

        debug!(
            "event=tags_resolve module=service status=ok requested={} resolved={}",
            raw_names.len(),
            resolved.len()
        );
        Ok(resolved)
    }

    /// Resolves names and returns only the identities, in resolution order.
    pub fn resolve_ids<S: AsRef<str>>(
        &self,
        owner_id: OwnerId,
        raw_names: &[S],
        now_ms: i64,
    ) -> EngineResult<Vec<TagId>> {
        Ok(self
            .resolve(owner_id, raw_names, now_ms)?
            .into_iter()
            .map(|tag| tag.uuid)
            .collect())
    }
}

/// Owner-facing tag listing, deletion and per-tag timeline.
pub struct TagService<'conn> {
    conn: &'conn Connection,
    feed: FeedConfig,
}

impl<'conn> TagService<'conn> {
    pub fn new(conn: &'conn Connection, feed: FeedConfig) -> Self {
        Self { conn, feed }
    }

    /// Lists the owner's tags, newest first.
    pub fn list_tags(&self, owner_id: OwnerId) -> EngineResult<Vec<Tag>> {
        Ok(SqliteTagRepository::new(self.conn).list_tags(owner_id)?)
    }

    /// Deletes one tag; its note/page associations go with it.
    pub fn delete_tag(&self, owner_id: OwnerId, tag_id: TagId) -> EngineResult<()> {
        let repo = SqliteTagRepository::new(self.conn);
        let tag = repo
            .find_tag(tag_id)?
            .ok_or_else(|| EngineError::not_found("tag", tag_id))?;
        if tag.owner_id != owner_id {
            return Err(EngineError::denied("tag", tag_id));
        }
        repo.delete_tag(tag_id)?;
        debug!(
            "event=tag_delete module=service status=ok tag_id={}",
            tag_id
        );
        Ok(())
    }

    /// Active notes and pages of `owner_id` carrying the tag `name`.
    ///
    /// Notes come first (newest first), then pages (most recently updated
    /// first); each list gets its own `limit`/`offset` window and `total` is
    /// the number of returned items. An unknown tag yields an empty timeline.
    pub fn tag_timeline(
        &self,
        owner_id: OwnerId,
        name: &str,
        limit: u32,
        offset: u32,
    ) -> EngineResult<Timeline> {
        let limit = self.feed.normalize_limit(limit);
        let Some(name) = normalize_tag_name(name) else {
            return Ok(Timeline { items: Vec::new(), total: 0 });
        };
        let tags = SqliteTagRepository::new(self.conn);
        let Some(tag) = tags.find_tag_by_name(owner_id, name)? else {
            debug!("event=tag_timeline module=service status=ok tag=unknown items=0");
            return Ok(Timeline { items: Vec::new(), total: 0 });
        };

        let notes = SqliteNoteRepository::new(self.conn)
            .list_notes_by_tag(owner_id, tag.uuid, limit, offset)?;
        let pages = SqlitePageRepository::new(self.conn)
            .list_pages_by_tag(owner_id, tag.uuid, limit, offset)?;
        let pages = page_entries(self.conn, pages, self.feed.max_page_images)?;

        let items: Vec<FeedItem> = notes
            .into_iter()
            .map(|note| FeedItem::Note(NoteFeedEntry::from(note)))
            .chain(pages.into_iter().map(FeedItem::Page))
            .collect();
        info!(
            "event=tag_timeline module=service status=ok tag_id={} limit={} offset={} items={}",
            tag.uuid,
            limit,
            offset,
            items.len()
        );
        Ok(Timeline {
            total: items.len(),
            items,
        })
    }
}
