//! Page repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist page headers (title, cover, summary, sharing state) and their
//!   tag associations. Blocks live in [`super::block_repo`].
//!
//! # Invariants
//! - `share_token` is NULL for private pages and globally unique otherwise.
//! - Public listings only return active pages with a share token.
//! - A page row cannot be purged while block rows still reference it.

use super::tag_repo::{load_linked_tags, replace_linked_tags, TagLink};
use super::{parse_uuid, RepoError, RepoResult};
use crate::model::item::{OwnerId, PageId, TagId};
use crate::model::page::{Page, Sharing};
use rusqlite::{params, Connection, Row, ToSql};

const PAGE_SELECT_SQL: &str = "SELECT
    uuid,
    owner_id,
    title,
    cover,
    summary,
    share_token,
    created_at,
    updated_at,
    deleted_at
FROM pages";

/// Repository interface for page headers.
pub trait PageRepository {
    fn create_page(&self, page: &Page) -> RepoResult<PageId>;
    /// Overwrites title, cover, summary, sharing and `updated_at` of an
    /// active page.
    fn update_page(&self, page: &Page) -> RepoResult<()>;
    fn find_page(&self, page_id: PageId, include_deleted: bool) -> RepoResult<Option<Page>>;
    /// Finds an active, shared page by its token.
    fn find_page_by_share_token(&self, token: &str) -> RepoResult<Option<Page>>;
    fn list_pages_by_owner(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Page>>;
    /// Lists active shared pages of every owner, newest first.
    fn list_public_pages(&self, limit: u32, offset: u32) -> RepoResult<Vec<Page>>;
    fn list_trashed_pages(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Page>>;
    /// Lists active pages of `owner_id` carrying `tag_id`, most recently
    /// updated first.
    fn list_pages_by_tag(
        &self,
        owner_id: OwnerId,
        tag_id: TagId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Page>>;
    /// Replaces the full tag association set.
    fn set_page_tags(&self, page_id: PageId, tag_ids: &[TagId]) -> RepoResult<()>;
    fn soft_delete_page(&self, page_id: PageId, deleted_at: i64) -> RepoResult<()>;
    fn restore_page(&self, page_id: PageId) -> RepoResult<()>;
    fn purge_page(&self, page_id: PageId) -> RepoResult<()>;
}

/// SQLite-backed page repository.
pub struct SqlitePageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePageRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_pages(&self, sql: &str, binds: &[&dyn ToSql]) -> RepoResult<Vec<Page>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(binds)?;
        let mut pages = Vec::new();
        while let Some(row) = rows.next()? {
            pages.push(parse_page_row(self.conn, row)?);
        }
        Ok(pages)
    }

    fn change_state(&self, sql: &str, page_id: PageId, binds: &[&dyn ToSql]) -> RepoResult<()> {
        let id_text = page_id.to_string();
        let mut all: Vec<&dyn ToSql> = vec![&id_text];
        all.extend_from_slice(binds);
        let changed = self.conn.execute(sql, all.as_slice())?;
        if changed == 0 {
            return Err(not_found(page_id));
        }
        Ok(())
    }
}

impl PageRepository for SqlitePageRepository<'_> {
    fn create_page(&self, page: &Page) -> RepoResult<PageId> {
        self.conn.execute(
            "INSERT INTO pages (
                uuid,
                owner_id,
                title,
                cover,
                summary,
                share_token,
                created_at,
                updated_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                page.uuid.to_string(),
                page.owner_id.to_string(),
                page.title.as_str(),
                page.cover.as_str(),
                page.summary.as_str(),
                page.sharing.token(),
                page.created_at,
                page.updated_at,
                page.deleted_at,
            ],
        )?;
        Ok(page.uuid)
    }

    fn update_page(&self, page: &Page) -> RepoResult<()> {
        let title = page.title.as_str();
        let cover = page.cover.as_str();
        let summary = page.summary.as_str();
        let token = page.sharing.token();
        self.change_state(
            "UPDATE pages
             SET
                title = ?2,
                cover = ?3,
                summary = ?4,
                share_token = ?5,
                updated_at = ?6
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            page.uuid,
            &[&title, &cover, &summary, &token, &page.updated_at],
        )
    }

    fn find_page(&self, page_id: PageId, include_deleted: bool) -> RepoResult<Option<Page>> {
        let id_text = page_id.to_string();
        let pages = self.query_pages(
            &format!(
                "{PAGE_SELECT_SQL}
                 WHERE uuid = ?1
                   AND (?2 = 1 OR deleted_at IS NULL);"
            ),
            &[&id_text, &include_deleted],
        )?;
        Ok(pages.into_iter().next())
    }

    fn find_page_by_share_token(&self, token: &str) -> RepoResult<Option<Page>> {
        let pages = self.query_pages(
            &format!(
                "{PAGE_SELECT_SQL}
                 WHERE share_token = ?1
                   AND share_token IS NOT NULL
                   AND deleted_at IS NULL;"
            ),
            &[&token],
        )?;
        Ok(pages.into_iter().next())
    }

    fn list_pages_by_owner(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Page>> {
        let owner_text = owner_id.to_string();
        self.query_pages(
            &format!(
                "{PAGE_SELECT_SQL}
                 WHERE owner_id = ?1
                   AND deleted_at IS NULL
                 ORDER BY created_at DESC, uuid ASC
                 LIMIT ?2 OFFSET ?3;"
            ),
            &[&owner_text, &limit, &offset],
        )
    }

    fn list_public_pages(&self, limit: u32, offset: u32) -> RepoResult<Vec<Page>> {
        self.query_pages(
            &format!(
                "{PAGE_SELECT_SQL}
                 WHERE share_token IS NOT NULL
                   AND deleted_at IS NULL
                 ORDER BY created_at DESC, uuid ASC
                 LIMIT ?1 OFFSET ?2;"
            ),
            &[&limit, &offset],
        )
    }

    fn list_trashed_pages(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Page>> {
        let owner_text = owner_id.to_string();
        self.query_pages(
            &format!(
                "{PAGE_SELECT_SQL}
                 WHERE owner_id = ?1
                   AND deleted_at IS NOT NULL
                 ORDER BY deleted_at DESC, uuid ASC
                 LIMIT ?2 OFFSET ?3;"
            ),
            &[&owner_text, &limit, &offset],
        )
    }

    fn list_pages_by_tag(
        &self,
        owner_id: OwnerId,
        tag_id: TagId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Page>> {
        let owner_text = owner_id.to_string();
        let tag_text = tag_id.to_string();
        self.query_pages(
            &format!(
                "{PAGE_SELECT_SQL}
                 WHERE owner_id = ?1
                   AND deleted_at IS NULL
                   AND uuid IN (SELECT page_uuid FROM page_tags WHERE tag_uuid = ?2)
                 ORDER BY updated_at DESC, uuid ASC
                 LIMIT ?3 OFFSET ?4;"
            ),
            &[&owner_text, &tag_text, &limit, &offset],
        )
    }

    fn set_page_tags(&self, page_id: PageId, tag_ids: &[TagId]) -> RepoResult<()> {
        replace_linked_tags(self.conn, TagLink::Page, &page_id.to_string(), tag_ids)
    }

    fn soft_delete_page(&self, page_id: PageId, deleted_at: i64) -> RepoResult<()> {
        self.change_state(
            "UPDATE pages
             SET deleted_at = ?2
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            page_id,
            &[&deleted_at],
        )
    }

    fn restore_page(&self, page_id: PageId) -> RepoResult<()> {
        self.change_state(
            "UPDATE pages
             SET deleted_at = NULL
             WHERE uuid = ?1
               AND deleted_at IS NOT NULL;",
            page_id,
            &[],
        )
    }

    fn purge_page(&self, page_id: PageId) -> RepoResult<()> {
        self.change_state(
            "DELETE FROM pages
             WHERE uuid = ?1
               AND deleted_at IS NOT NULL;",
            page_id,
            &[],
        )
    }
}

fn not_found(id: PageId) -> RepoError {
    RepoError::NotFound { entity: "page", id }
}

fn parse_page_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Page> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_id")?;
    let sharing = match row.get::<_, Option<String>>("share_token")? {
        Some(token) if token.is_empty() => {
            return Err(RepoError::InvalidData(format!(
                "empty share token in pages.share_token for `{uuid_text}`"
            )));
        }
        Some(token) => Sharing::Shared { token },
        None => Sharing::Private,
    };

    Ok(Page {
        uuid: parse_uuid(&uuid_text, "pages.uuid")?,
        owner_id: parse_uuid(&owner_text, "pages.owner_id")?,
        title: row.get("title")?,
        cover: row.get("cover")?,
        summary: row.get("summary")?,
        sharing,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
        tags: load_linked_tags(conn, TagLink::Page, &uuid_text)?,
    })
}
