//! Block repository: ordered content rows owned by one page.
//!
//! # Responsibility
//! - Store, list and cascade lifecycle transitions for a page's blocks.
//! - Own the replacement strategy used by composite page writes.
//!
//! # Invariants
//! - Blocks are only mutated through their page; there is no single-block
//!   delete.
//! - Listings return active blocks ordered by `sort_order ASC`.

use super::{parse_uuid, RepoResult};
use crate::model::block::{Block, BlockPayload};
use crate::model::item::PageId;
use rusqlite::{params, Connection, Row};

/// Repository interface for page blocks.
pub trait BlockRepository {
    /// Swaps the full block set of `page_id` for `blocks`.
    ///
    /// Existing rows (active or trashed) are removed physically before the
    /// new rows are inserted. Implementations may substitute a diffing
    /// strategy as long as the resulting row set is identical.
    fn replace_page_blocks(&self, page_id: PageId, blocks: &[Block]) -> RepoResult<()>;
    fn list_page_blocks(&self, page_id: PageId) -> RepoResult<Vec<Block>>;
    /// Returns the number of blocks moved to trash.
    fn soft_delete_page_blocks(&self, page_id: PageId, deleted_at: i64) -> RepoResult<usize>;
    /// Returns the number of blocks restored.
    fn restore_page_blocks(&self, page_id: PageId) -> RepoResult<usize>;
    /// Returns the number of rows physically removed.
    fn purge_page_blocks(&self, page_id: PageId) -> RepoResult<usize>;
}

/// SQLite-backed block repository.
pub struct SqliteBlockRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlockRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BlockRepository for SqliteBlockRepository<'_> {
    fn replace_page_blocks(&self, page_id: PageId, blocks: &[Block]) -> RepoResult<()> {
        let page_text = page_id.to_string();
        self.conn
            .execute("DELETE FROM blocks WHERE page_uuid = ?1;", [&page_text])?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO blocks (
                page_uuid,
                block_id,
                type,
                data,
                sort_order,
                created_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        )?;
        for block in blocks {
            stmt.execute(params![
                page_text.as_str(),
                block.block_id.as_str(),
                block.kind.as_str(),
                block.data.to_json_text()?,
                block.sort_order,
                block.created_at,
                block.deleted_at,
            ])?;
        }
        Ok(())
    }

    fn list_page_blocks(&self, page_id: PageId) -> RepoResult<Vec<Block>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_uuid, block_id, type, data, sort_order, created_at, deleted_at
             FROM blocks
             WHERE page_uuid = ?1
               AND deleted_at IS NULL
             ORDER BY sort_order ASC;",
        )?;
        let mut rows = stmt.query([page_id.to_string()])?;
        let mut blocks = Vec::new();
        while let Some(row) = rows.next()? {
            blocks.push(parse_block_row(row)?);
        }
        Ok(blocks)
    }

    fn soft_delete_page_blocks(&self, page_id: PageId, deleted_at: i64) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "UPDATE blocks
             SET deleted_at = ?2
             WHERE page_uuid = ?1
               AND deleted_at IS NULL;",
            params![page_id.to_string(), deleted_at],
        )?)
    }

    fn restore_page_blocks(&self, page_id: PageId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "UPDATE blocks
             SET deleted_at = NULL
             WHERE page_uuid = ?1
               AND deleted_at IS NOT NULL;",
            [page_id.to_string()],
        )?)
    }

    fn purge_page_blocks(&self, page_id: PageId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM blocks WHERE page_uuid = ?1;",
            [page_id.to_string()],
        )?)
    }
}

fn parse_block_row(row: &Row<'_>) -> RepoResult<Block> {
    let page_text: String = row.get("page_uuid")?;
    let data_text: String = row.get("data")?;
    Ok(Block {
        page_uuid: parse_uuid(&page_text, "blocks.page_uuid")?,
        block_id: row.get("block_id")?,
        kind: row.get("type")?,
        data: BlockPayload::from_json_text(&data_text),
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
