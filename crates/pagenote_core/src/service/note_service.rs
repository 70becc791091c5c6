//! Note use-cases.
//!
//! # Responsibility
//! - Create and fully replace notes, deriving tags from `#hashtags`.
//! - Serve owner-scoped note reads.
//!
//! # Invariants
//! - Content, images and tag associations of a note change together.
//! - Notes are private: every read and write checks the owner.

use super::error::{EngineError, EngineResult};
use super::tag_resolver::TagResolver;
use crate::db::with_transaction;
use crate::model::item::{NoteId, OwnerId};
use crate::model::note::{extract_hashtags, Note};
use crate::model::now_epoch_ms;
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::tag_repo::SqliteTagRepository;
use crate::repo::RepoError;
use log::info;
use rusqlite::{Connection, Transaction};

const DEFAULT_NOTE_LIMIT: u32 = 20;
const MAX_NOTE_LIMIT: u32 = 100;

/// Note service bound to one connection.
pub struct NoteService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> NoteService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Creates a note; `source` defaults to `web`.
    pub fn create_note(
        &mut self,
        owner_id: OwnerId,
        content: &str,
        images: Vec<String>,
        source: Option<&str>,
    ) -> EngineResult<Note> {
        let now = now_epoch_ms();
        let mut note = Note::new(owner_id, content, now);
        note.images = images;
        if let Some(source) = source.map(str::trim).filter(|value| !value.is_empty()) {
            note.source = source.to_string();
        }

        let note = with_transaction(self.conn, |tx| -> EngineResult<Note> {
            SqliteNoteRepository::new(tx).create_note(&note)?;
            attach_hashtags(tx, &note, now)
        })?;
        info!(
            "event=note_create module=service status=ok note_id={} tags={}",
            note.uuid,
            note.tags.len()
        );
        Ok(note)
    }

    /// Replaces content, images and hashtag tags of an active note.
    pub fn update_note(
        &mut self,
        owner_id: OwnerId,
        note_id: NoteId,
        content: &str,
        images: Vec<String>,
    ) -> EngineResult<Note> {
        let now = now_epoch_ms();
        let note = with_transaction(self.conn, |tx| -> EngineResult<Note> {
            let notes = SqliteNoteRepository::new(tx);
            let mut note = notes
                .find_note(note_id, false)?
                .ok_or_else(|| EngineError::not_found("note", note_id))?;
            if note.owner_id != owner_id {
                return Err(EngineError::denied("note", note_id));
            }
            note.content = content.to_string();
            note.images = images;
            note.updated_at = now;
            notes.update_note(&note)?;
            attach_hashtags(tx, &note, now)
        })?;
        info!(
            "event=note_update module=service status=ok note_id={} tags={}",
            note.uuid,
            note.tags.len()
        );
        Ok(note)
    }

    pub fn get_note(&self, owner_id: OwnerId, note_id: NoteId) -> EngineResult<Note> {
        let note = SqliteNoteRepository::new(self.conn)
            .find_note(note_id, false)?
            .ok_or_else(|| EngineError::not_found("note", note_id))?;
        if note.owner_id != owner_id {
            return Err(EngineError::denied("note", note_id));
        }
        Ok(note)
    }

    /// Active notes of `owner_id`, newest first.
    pub fn list_notes(&self, owner_id: OwnerId, limit: u32, offset: u32) -> EngineResult<Vec<Note>> {
        let limit = match limit {
            0 => DEFAULT_NOTE_LIMIT,
            value => value.min(MAX_NOTE_LIMIT),
        };
        Ok(SqliteNoteRepository::new(self.conn).list_notes_by_owner(owner_id, limit, offset)?)
    }
}

fn attach_hashtags(tx: &Transaction<'_>, note: &Note, now: i64) -> EngineResult<Note> {
    let names = extract_hashtags(&note.content);
    let tag_ids = TagResolver::new(SqliteTagRepository::new(tx)).resolve_ids(note.owner_id, &names, now)?;

    let notes = SqliteNoteRepository::new(tx);
    notes.set_note_tags(note.uuid, &tag_ids)?;
    notes.find_note(note.uuid, false)?.ok_or_else(|| {
        EngineError::StorageFailure(RepoError::InvalidData(format!(
            "note {} missing after write",
            note.uuid
        )))
    })
}
