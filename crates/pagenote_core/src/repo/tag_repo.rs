//! Owner-scoped tag repository and SQLite implementation.
//!
//! # Responsibility
//! - Find and create tags per owner with insert-if-absent semantics.
//! - Own the note/page tag association tables.
//!
//! # Invariants
//! - `(owner_id, name)` is unique; the `UNIQUE` constraint, not a lock, is
//!   what keeps concurrent resolvers from creating duplicates.
//! - Association replacement is clear-then-insert, never a diff.

use super::{parse_uuid, placeholders, RepoError, RepoResult};
use crate::model::item::{OwnerId, TagId};
use crate::model::tag::Tag;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const TAG_SELECT_SQL: &str = "SELECT uuid, owner_id, name, created_at FROM tags";

/// Rows per multi-row insert; four binds each stays under SQLite's variable cap.
const INSERT_CHUNK_ROWS: usize = 200;

/// Repository interface for tag records.
pub trait TagRepository {
    /// Loads existing tags of `owner_id` whose names are in `names`.
    fn find_tags_by_names(&self, owner_id: OwnerId, names: &[String]) -> RepoResult<Vec<Tag>>;

    /// Inserts one row per name unless `(owner_id, name)` already exists.
    ///
    /// Returns the number of rows actually inserted.
    fn insert_tags_if_absent(
        &self,
        owner_id: OwnerId,
        names: &[String],
        created_at: i64,
    ) -> RepoResult<usize>;

    fn find_tag(&self, tag_id: TagId) -> RepoResult<Option<Tag>>;

    /// Looks up one tag of `owner_id` by its exact, normalized name.
    fn find_tag_by_name(&self, owner_id: OwnerId, name: &str) -> RepoResult<Option<Tag>>;

    /// Lists all tags of one owner, newest first.
    fn list_tags(&self, owner_id: OwnerId) -> RepoResult<Vec<Tag>>;

    /// Physically removes one tag; associations go with it.
    fn delete_tag(&self, tag_id: TagId) -> RepoResult<()>;

    /// Batch find-or-create for already-normalized, distinct names.
    ///
    /// One read for existing rows, one insert-if-absent pass for the rest,
    /// then a re-read of the missing names. The re-read picks up rows that a
    /// concurrent writer inserted between our read and our insert; the
    /// insert skips those names instead of failing.
    ///
    /// Result order is unspecified; callers re-order by name.
    fn find_or_create_batch(
        &self,
        owner_id: OwnerId,
        names: &[String],
        created_at: i64,
    ) -> RepoResult<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved = self.find_tags_by_names(owner_id, names)?;
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !resolved.iter().any(|tag| &tag.name == *name))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(resolved);
        }

        let inserted = self.insert_tags_if_absent(owner_id, &missing, created_at)?;
        if inserted < missing.len() {
            debug!(
                "event=tag_insert_conflict module=repo status=ok requested={} inserted={}",
                missing.len(),
                inserted
            );
        }

        let reread = self.find_tags_by_names(owner_id, &missing)?;
        for name in &missing {
            if !reread.iter().any(|tag| &tag.name == name) {
                return Err(RepoError::InvalidData(format!(
                    "tag `{name}` missing after insert-if-absent"
                )));
            }
        }
        resolved.extend(reread);
        Ok(resolved)
    }
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn find_tags_by_names(&self, owner_id: OwnerId, names: &[String]) -> RepoResult<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{TAG_SELECT_SQL} WHERE owner_id = ? AND name IN ({});",
            placeholders(names.len())
        );
        let mut binds = Vec::with_capacity(names.len() + 1);
        binds.push(Value::Text(owner_id.to_string()));
        binds.extend(names.iter().map(|name| Value::Text(name.clone())));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn insert_tags_if_absent(
        &self,
        owner_id: OwnerId,
        names: &[String],
        created_at: i64,
    ) -> RepoResult<usize> {
        let owner_text = owner_id.to_string();
        let mut inserted = 0;
        for chunk in names.chunks(INSERT_CHUNK_ROWS) {
            let rows = vec!["(?, ?, ?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO tags (uuid, owner_id, name, created_at)
                 VALUES {rows}
                 ON CONFLICT (owner_id, name) DO NOTHING;"
            );
            let mut binds = Vec::with_capacity(chunk.len() * 4);
            for name in chunk {
                binds.push(Value::Text(Uuid::new_v4().to_string()));
                binds.push(Value::Text(owner_text.clone()));
                binds.push(Value::Text(name.clone()));
                binds.push(Value::Integer(created_at));
            }
            inserted += self.conn.execute(&sql, params_from_iter(binds))?;
        }
        Ok(inserted)
    }

    fn find_tag(&self, tag_id: TagId) -> RepoResult<Option<Tag>> {
        self.conn
            .query_row(
                &format!("{TAG_SELECT_SQL} WHERE uuid = ?1;"),
                [tag_id.to_string()],
                |row| Ok(parse_tag_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_tag_by_name(&self, owner_id: OwnerId, name: &str) -> RepoResult<Option<Tag>> {
        self.conn
            .query_row(
                &format!("{TAG_SELECT_SQL} WHERE owner_id = ?1 AND name = ?2;"),
                params![owner_id.to_string(), name],
                |row| Ok(parse_tag_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_tags(&self, owner_id: OwnerId) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TAG_SELECT_SQL} WHERE owner_id = ?1 ORDER BY created_at DESC, name ASC;"
        ))?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn delete_tag(&self, tag_id: TagId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE uuid = ?1;", [tag_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "tag",
                id: tag_id,
            });
        }
        Ok(())
    }
}

/// Association table a tag set is attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagLink {
    Note,
    Page,
}

impl TagLink {
    fn table(self) -> &'static str {
        match self {
            Self::Note => "note_tags",
            Self::Page => "page_tags",
        }
    }

    fn item_column(self) -> &'static str {
        match self {
            Self::Note => "note_uuid",
            Self::Page => "page_uuid",
        }
    }
}

/// Loads the tags attached to one note/page in association order.
pub(crate) fn load_linked_tags(
    conn: &Connection,
    link: TagLink,
    item_uuid: &str,
) -> RepoResult<Vec<Tag>> {
    let sql = format!(
        "SELECT t.uuid AS uuid, t.owner_id AS owner_id, t.name AS name, t.created_at AS created_at
         FROM {table} link
         INNER JOIN tags t ON t.uuid = link.tag_uuid
         WHERE link.{column} = ?1
         ORDER BY link.position ASC, t.name ASC;",
        table = link.table(),
        column = link.item_column(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([item_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(parse_tag_row(row)?);
    }
    Ok(tags)
}

/// Clears every association of one note/page, then attaches `tag_ids` in order.
pub(crate) fn replace_linked_tags(
    conn: &Connection,
    link: TagLink,
    item_uuid: &str,
    tag_ids: &[TagId],
) -> RepoResult<()> {
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1;",
            link.table(),
            link.item_column()
        ),
        [item_uuid],
    )?;

    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {} ({}, tag_uuid, position) VALUES (?1, ?2, ?3);",
        link.table(),
        link.item_column()
    ))?;
    for (position, tag_id) in tag_ids.iter().enumerate() {
        stmt.execute(params![item_uuid, tag_id.to_string(), position as i64])?;
    }
    Ok(())
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_id")?;
    Ok(Tag {
        uuid: parse_uuid(&uuid_text, "tags.uuid")?,
        owner_id: parse_uuid(&owner_text, "tags.owner_id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}
