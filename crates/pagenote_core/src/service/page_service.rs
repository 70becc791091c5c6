//! Page use-cases: composite writes, reads and sharing.
//!
//! # Responsibility
//! - Save a page header, its ordered blocks and its tag set as one unit.
//! - Serve page reads for owners, anonymous viewers and share links.
//! - Toggle the sharing state of a page.
//!
//! # Invariants
//! - A composite save either persists header, blocks and tags together or
//!   leaves storage untouched.
//! - Updates replace the whole block set and the whole tag set; nothing is
//!   diffed and no block history is kept.
//! - `summary`, `created_at` and `updated_at` are always server-derived.

use super::error::{EngineError, EngineResult};
use super::tag_resolver::TagResolver;
use crate::db::with_transaction;
use crate::model::block::{derive_summary, layout_blocks, Block, BlockInput};
use crate::model::item::{OwnerId, PageId, Viewer};
use crate::model::now_epoch_ms;
use crate::model::page::{Page, Sharing};
use crate::repo::block_repo::{BlockRepository, SqliteBlockRepository};
use crate::repo::page_repo::{PageRepository, SqlitePageRepository};
use crate::repo::tag_repo::SqliteTagRepository;
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// Relative path prefix of public share links.
pub const SHARE_LINK_PREFIX: &str = "/s/";

/// Full content of one composite page write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<BlockInput>,
}

/// Result of a composite save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavedPage {
    pub page_id: PageId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Page header plus its active blocks in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub page: Page,
    pub blocks: Vec<Block>,
}

/// Sharing outcome returned to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareState {
    pub page_id: PageId,
    pub token: Option<String>,
    /// `/s/<token>` when shared.
    pub link: Option<String>,
}

/// Page service bound to one connection.
pub struct PageService<'conn> {
    conn: &'conn mut Connection,
    summary_max_chars: usize,
}

impl<'conn> PageService<'conn> {
    pub fn new(conn: &'conn mut Connection, summary_max_chars: usize) -> Self {
        Self {
            conn,
            summary_max_chars,
        }
    }

    /// Creates (`page_id = None`) or fully replaces a page with its blocks
    /// and tags in one transaction.
    ///
    /// # Errors
    /// - `ValidationFailed` for blank or duplicate block ids, or blank block
    ///   types.
    /// - `NotFound` when `page_id` names no active page.
    /// - `PermissionDenied` when the page belongs to another owner.
    /// - `StorageFailure` for persistence errors; nothing is kept.
    pub fn save_composite(
        &mut self,
        owner_id: OwnerId,
        page_id: Option<PageId>,
        draft: &PageDraft,
    ) -> EngineResult<SavedPage> {
        let started_at = Instant::now();
        validate_blocks(&draft.blocks)?;

        let now = now_epoch_ms();
        let summary = derive_summary(&draft.blocks, self.summary_max_chars);
        let result = with_transaction(self.conn, |tx| -> EngineResult<SavedPage> {
            let pages = SqlitePageRepository::new(tx);
            let page = match page_id {
                None => {
                    let mut page = Page::new(owner_id, draft.title.as_str(), now);
                    page.cover = draft.cover.clone();
                    page.summary = summary;
                    pages.create_page(&page)?;
                    page
                }
                Some(id) => {
                    let mut page = pages
                        .find_page(id, false)?
                        .ok_or_else(|| EngineError::not_found("page", id))?;
                    if page.owner_id != owner_id {
                        return Err(EngineError::denied("page", id));
                    }
                    page.title = draft.title.clone();
                    page.cover = draft.cover.clone();
                    page.summary = summary;
                    page.updated_at = now;
                    pages.update_page(&page)?;
                    page
                }
            };

            let blocks = layout_blocks(page.uuid, &draft.blocks, now);
            SqliteBlockRepository::new(tx).replace_page_blocks(page.uuid, &blocks)?;

            let tag_ids =
                TagResolver::new(SqliteTagRepository::new(tx)).resolve_ids(owner_id, &draft.tags, now)?;
            pages.set_page_tags(page.uuid, &tag_ids)?;

            Ok(SavedPage {
                page_id: page.uuid,
                created_at: page.created_at,
                updated_at: page.updated_at,
            })
        });

        match &result {
            Ok(saved) => info!(
                "event=page_save module=service status=ok page_id={} mode={} blocks={} duration_ms={}",
                saved.page_id,
                if page_id.is_some() { "update" } else { "create" },
                draft.blocks.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=page_save module=service status=error code={} duration_ms={}",
                err.code(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Loads an active page for `viewer`.
    ///
    /// Owners see their own pages; everyone else only sees shared pages.
    pub fn get_page(&self, viewer: Viewer, page_id: PageId) -> EngineResult<PageView> {
        let page = SqlitePageRepository::new(self.conn)
            .find_page(page_id, false)?
            .ok_or_else(|| EngineError::not_found("page", page_id))?;
        let is_owner = viewer.owner_id() == Some(page.owner_id);
        if !is_owner && !page.sharing.is_shared() {
            return Err(EngineError::denied("page", page_id));
        }
        self.with_blocks(page)
    }

    /// Loads an active, shared page through its public token.
    ///
    /// A blank token is a validation failure; a token that matches no
    /// shared page (unknown, revoked, or trashed) is `NotFound`.
    pub fn get_page_by_share_token(&self, token: &str) -> EngineResult<PageView> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EngineError::ValidationFailed(
                "share token cannot be empty".to_string(),
            ));
        }
        let page = SqlitePageRepository::new(self.conn)
            .find_page_by_share_token(token)?
            .ok_or_else(|| EngineError::not_found("shared page", token))?;
        self.with_blocks(page)
    }

    /// Enables or disables sharing of an owned page.
    ///
    /// Enabling an already shared page keeps its token. Disabling drops the
    /// token for good; a later enable issues a new one.
    pub fn set_sharing(
        &mut self,
        owner_id: OwnerId,
        page_id: PageId,
        enable: bool,
    ) -> EngineResult<ShareState> {
        let now = now_epoch_ms();
        let state = with_transaction(self.conn, |tx| -> EngineResult<ShareState> {
            let pages = SqlitePageRepository::new(tx);
            let mut page = pages
                .find_page(page_id, false)?
                .ok_or_else(|| EngineError::not_found("page", page_id))?;
            if page.owner_id != owner_id {
                return Err(EngineError::denied("page", page_id));
            }

            let next = match (enable, &page.sharing) {
                (true, Sharing::Shared { .. }) => page.sharing.clone(),
                (true, Sharing::Private) => Sharing::shared_with_new_token(),
                (false, _) => Sharing::Private,
            };
            if next != page.sharing {
                page.sharing = next;
                page.updated_at = now;
                pages.update_page(&page)?;
            }

            let token = page.sharing.token().map(str::to_string);
            Ok(ShareState {
                page_id,
                link: token.as_deref().map(share_link),
                token,
            })
        })?;

        info!(
            "event=page_share module=service status=ok page_id={} shared={}",
            page_id,
            state.token.is_some()
        );
        Ok(state)
    }

    fn with_blocks(&self, page: Page) -> EngineResult<PageView> {
        let blocks = SqliteBlockRepository::new(self.conn).list_page_blocks(page.uuid)?;
        Ok(PageView { page, blocks })
    }
}

/// Relative public link for a share token.
pub fn share_link(token: &str) -> String {
    format!("{SHARE_LINK_PREFIX}{token}")
}

fn validate_blocks(blocks: &[BlockInput]) -> EngineResult<()> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        if block.id.trim().is_empty() {
            return Err(EngineError::ValidationFailed(format!(
                "block at index {index} has an empty id"
            )));
        }
        if block.kind.trim().is_empty() {
            return Err(EngineError::ValidationFailed(format!(
                "block `{}` has an empty type",
                block.id
            )));
        }
        if !seen.insert(block.id.as_str()) {
            return Err(EngineError::ValidationFailed(format!(
                "duplicate block id `{}`",
                block.id
            )));
        }
    }
    Ok(())
}
