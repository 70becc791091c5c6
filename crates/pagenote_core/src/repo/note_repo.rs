//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes, their image lists and tag associations.
//! - Provide owner-scoped active and trash listings.
//!
//! # Invariants
//! - Active listings are ordered `created_at DESC, uuid ASC`.
//! - Trash listings are ordered `deleted_at DESC, uuid ASC`.
//! - Soft delete only touches active rows; restore and purge only touch
//!   trashed rows.

use super::tag_repo::{load_linked_tags, replace_linked_tags, TagLink};
use super::{parse_uuid, RepoError, RepoResult};
use crate::model::item::{NoteId, OwnerId, TagId};
use crate::model::note::Note;
use rusqlite::{params, Connection, Row, ToSql};

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    owner_id,
    content,
    images,
    source,
    created_at,
    updated_at,
    deleted_at
FROM notes";

/// Repository interface for notes.
pub trait NoteRepository {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId>;
    /// Overwrites content, images and `updated_at` of an active note.
    fn update_note(&self, note: &Note) -> RepoResult<()>;
    fn find_note(&self, note_id: NoteId, include_deleted: bool) -> RepoResult<Option<Note>>;
    fn list_notes_by_owner(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Note>>;
    fn list_trashed_notes(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Note>>;
    /// Lists active notes of `owner_id` carrying `tag_id`, newest first.
    fn list_notes_by_tag(
        &self,
        owner_id: OwnerId,
        tag_id: TagId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Note>>;
    /// Replaces the full tag association set.
    fn set_note_tags(&self, note_id: NoteId, tag_ids: &[TagId]) -> RepoResult<()>;
    fn soft_delete_note(&self, note_id: NoteId, deleted_at: i64) -> RepoResult<()>;
    fn restore_note(&self, note_id: NoteId) -> RepoResult<()>;
    fn purge_note(&self, note_id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_notes(&self, sql: &str, binds: &[&dyn ToSql]) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(binds)?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(self.conn, row)?);
        }
        Ok(notes)
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId> {
        self.conn.execute(
            "INSERT INTO notes (
                uuid,
                owner_id,
                content,
                images,
                source,
                created_at,
                updated_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                note.uuid.to_string(),
                note.owner_id.to_string(),
                note.content.as_str(),
                serde_json::to_string(&note.images)?,
                note.source.as_str(),
                note.created_at,
                note.updated_at,
                note.deleted_at,
            ],
        )?;
        Ok(note.uuid)
    }

    fn update_note(&self, note: &Note) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                content = ?2,
                images = ?3,
                updated_at = ?4
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            params![
                note.uuid.to_string(),
                note.content.as_str(),
                serde_json::to_string(&note.images)?,
                note.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(not_found(note.uuid));
        }
        Ok(())
    }

    fn find_note(&self, note_id: NoteId, include_deleted: bool) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR deleted_at IS NULL);"
        ))?;
        let mut rows = stmt.query(params![note_id.to_string(), include_deleted])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_notes_by_owner(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Note>> {
        self.query_notes(
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE owner_id = ?1
                   AND deleted_at IS NULL
                 ORDER BY created_at DESC, uuid ASC
                 LIMIT ?2 OFFSET ?3;"
            ),
            &[&owner_id.to_string(), &limit, &offset],
        )
    }

    fn list_trashed_notes(
        &self,
        owner_id: OwnerId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Note>> {
        self.query_notes(
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE owner_id = ?1
                   AND deleted_at IS NOT NULL
                 ORDER BY deleted_at DESC, uuid ASC
                 LIMIT ?2 OFFSET ?3;"
            ),
            &[&owner_id.to_string(), &limit, &offset],
        )
    }

    fn list_notes_by_tag(
        &self,
        owner_id: OwnerId,
        tag_id: TagId,
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Note>> {
        self.query_notes(
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE owner_id = ?1
                   AND deleted_at IS NULL
                   AND uuid IN (SELECT note_uuid FROM note_tags WHERE tag_uuid = ?2)
                 ORDER BY created_at DESC, uuid ASC
                 LIMIT ?3 OFFSET ?4;"
            ),
            &[&owner_id.to_string(), &tag_id.to_string(), &limit, &offset],
        )
    }

    fn set_note_tags(&self, note_id: NoteId, tag_ids: &[TagId]) -> RepoResult<()> {
        replace_linked_tags(self.conn, TagLink::Note, &note_id.to_string(), tag_ids)
    }

    fn soft_delete_note(&self, note_id: NoteId, deleted_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET deleted_at = ?2
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            params![note_id.to_string(), deleted_at],
        )?;
        if changed == 0 {
            return Err(not_found(note_id));
        }
        Ok(())
    }

    fn restore_note(&self, note_id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET deleted_at = NULL
             WHERE uuid = ?1
               AND deleted_at IS NOT NULL;",
            [note_id.to_string()],
        )?;
        if changed == 0 {
            return Err(not_found(note_id));
        }
        Ok(())
    }

    fn purge_note(&self, note_id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM notes
             WHERE uuid = ?1
               AND deleted_at IS NOT NULL;",
            [note_id.to_string()],
        )?;
        if changed == 0 {
            return Err(not_found(note_id));
        }
        Ok(())
    }
}

fn not_found(id: NoteId) -> RepoError {
    RepoError::NotFound { entity: "note", id }
}

fn parse_note_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Note> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_id")?;
    let images_text: String = row.get("images")?;
    let images: Vec<String> = serde_json::from_str(&images_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid images value in notes.images for `{uuid_text}`: {err}"
        ))
    })?;

    Ok(Note {
        uuid: parse_uuid(&uuid_text, "notes.uuid")?,
        owner_id: parse_uuid(&owner_text, "notes.owner_id")?,
        content: row.get("content")?,
        images,
        source: row.get("source")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
        tags: load_linked_tags(conn, TagLink::Note, &uuid_text)?,
    })
}
