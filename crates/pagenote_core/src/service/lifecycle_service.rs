//! Trash lifecycle of notes and pages.
//!
//! # Responsibility
//! - Move notes and pages between active, trashed and purged.
//! - Cascade every page transition to the page's blocks.
//! - List an owner's trash.
//!
//! # Invariants
//! - `ACTIVE -> TRASHED -> {ACTIVE, PURGED}`; purged is terminal.
//! - Every transition checks that the acting owner owns the item.
//! - A transition from the wrong state reports `NotFound`.
//! - Page and blocks change together inside one transaction; on purge the
//!   blocks are removed before the page.

use super::error::{EngineError, EngineResult};
use crate::db::with_transaction;
use crate::model::item::{ItemType, OwnerId};
use crate::model::now_epoch_ms;
use crate::repo::block_repo::{BlockRepository, SqliteBlockRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::page_repo::{PageRepository, SqlitePageRepository};
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

const DEFAULT_TRASH_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Trash,
    Restore,
    Purge,
}

impl Transition {
    fn as_str(self) -> &'static str {
        match self {
            Self::Trash => "trash",
            Self::Restore => "restore",
            Self::Purge => "purge",
        }
    }

    /// Whether the item must already be in the trash.
    fn from_trash(self) -> bool {
        !matches!(self, Self::Trash)
    }
}

/// One row of an owner's trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashItem {
    #[serde(rename = "type")]
    pub kind: ItemType,
    pub id: Uuid,
    /// Page title; empty for notes.
    pub title: String,
    /// Note content or page summary.
    pub content: String,
    pub deleted_at: i64,
}

/// Trashed notes followed by trashed pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashListing {
    pub items: Vec<TrashItem>,
    pub total: usize,
}

/// Lifecycle service bound to one connection.
pub struct LifecycleService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> LifecycleService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Moves an active item (and a page's blocks) to the trash.
    pub fn soft_delete(
        &mut self,
        item_type: ItemType,
        id: Uuid,
        acting_owner: OwnerId,
    ) -> EngineResult<()> {
        self.transition(item_type, id, acting_owner, Transition::Trash)
    }

    /// Brings a trashed item (and a page's blocks) back to active.
    pub fn restore(
        &mut self,
        item_type: ItemType,
        id: Uuid,
        acting_owner: OwnerId,
    ) -> EngineResult<()> {
        self.transition(item_type, id, acting_owner, Transition::Restore)
    }

    /// Physically removes a trashed item; a page's blocks go first.
    pub fn purge(&mut self, item_type: ItemType, id: Uuid, acting_owner: OwnerId) -> EngineResult<()> {
        self.transition(item_type, id, acting_owner, Transition::Purge)
    }

    /// Lists trashed notes and trashed pages of `owner_id`.
    ///
    /// Both lists are queried independently with the same window, each
    /// ordered by deletion time descending, and concatenated notes first.
    /// The result is not one chronological sequence.
    pub fn list_trash(&self, owner_id: OwnerId, limit: u32, offset: u32) -> EngineResult<TrashListing> {
        let limit = if limit == 0 { DEFAULT_TRASH_LIMIT } else { limit };
        let notes = SqliteNoteRepository::new(self.conn).list_trashed_notes(owner_id, limit, offset)?;
        let pages = SqlitePageRepository::new(self.conn).list_trashed_pages(owner_id, limit, offset)?;

        let mut items = Vec::with_capacity(notes.len() + pages.len());
        items.extend(notes.into_iter().map(|note| TrashItem {
            kind: ItemType::Note,
            id: note.uuid,
            title: String::new(),
            content: note.content,
            deleted_at: note.deleted_at.unwrap_or_default(),
        }));
        items.extend(pages.into_iter().map(|page| TrashItem {
            kind: ItemType::Page,
            id: page.uuid,
            title: page.title,
            content: page.summary,
            deleted_at: page.deleted_at.unwrap_or_default(),
        }));

        Ok(TrashListing {
            total: items.len(),
            items,
        })
    }

    fn transition(
        &mut self,
        item_type: ItemType,
        id: Uuid,
        acting_owner: OwnerId,
        transition: Transition,
    ) -> EngineResult<()> {
        let started_at = Instant::now();
        let now = now_epoch_ms();
        let result = with_transaction(self.conn, |tx| -> EngineResult<usize> {
            let (owner_id, deleted_at) = match item_type {
                ItemType::Note => SqliteNoteRepository::new(tx)
                    .find_note(id, true)?
                    .map(|note| (note.owner_id, note.deleted_at)),
                ItemType::Page => SqlitePageRepository::new(tx)
                    .find_page(id, true)?
                    .map(|page| (page.owner_id, page.deleted_at)),
            }
            .ok_or_else(|| EngineError::not_found(item_type.as_str(), id))?;

            if owner_id != acting_owner {
                return Err(EngineError::denied(item_type.as_str(), id));
            }
            if deleted_at.is_some() != transition.from_trash() {
                return Err(EngineError::not_found(item_type.as_str(), id));
            }

            match item_type {
                ItemType::Note => {
                    let notes = SqliteNoteRepository::new(tx);
                    match transition {
                        Transition::Trash => notes.soft_delete_note(id, now)?,
                        Transition::Restore => notes.restore_note(id)?,
                        Transition::Purge => notes.purge_note(id)?,
                    }
                    Ok(0)
                }
                ItemType::Page => {
                    let pages = SqlitePageRepository::new(tx);
                    let blocks = SqliteBlockRepository::new(tx);
                    match transition {
                        Transition::Trash => {
                            pages.soft_delete_page(id, now)?;
                            Ok(blocks.soft_delete_page_blocks(id, now)?)
                        }
                        Transition::Restore => {
                            pages.restore_page(id)?;
                            Ok(blocks.restore_page_blocks(id)?)
                        }
                        Transition::Purge => {
                            let removed = blocks.purge_page_blocks(id)?;
                            pages.purge_page(id)?;
                            Ok(removed)
                        }
                    }
                }
            }
        });

        match result {
            Ok(blocks) => {
                info!(
                    "event=item_{} module=service status=ok type={} id={} blocks={} duration_ms={}",
                    transition.as_str(),
                    item_type,
                    id,
                    blocks,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=item_{} module=service status=error type={} id={} code={}",
                    transition.as_str(),
                    item_type,
                    id,
                    err.code()
                );
                Err(err)
            }
        }
    }
}
