//! Error taxonomy shared by every engine use-case.

use crate::db::DbError;
use crate::model::item::{parse_uuid_text, ItemType};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    /// Referenced item is absent or not in the state the operation needs.
    /// `id` is the identifier as the caller supplied it (uuid or share token).
    NotFound { kind: &'static str, id: String },
    /// Acting owner does not own the referenced item.
    PermissionDenied { kind: &'static str, id: Uuid },
    /// Caller input is malformed.
    ValidationFailed(String),
    /// Opaque persistence failure.
    StorageFailure(RepoError),
}

impl EngineError {
    pub(crate) fn denied(kind: &'static str, id: Uuid) -> Self {
        Self::PermissionDenied { kind, id }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Display) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    /// Stable short code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::ValidationFailed(_) => "validation_failed",
            Self::StorageFailure(_) => "storage_failure",
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::PermissionDenied { kind, id } => write!(f, "permission denied for {kind} {id}"),
            Self::ValidationFailed(message) => write!(f, "validation failed: {message}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::not_found(entity, id),
            other => Self::StorageFailure(other),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::StorageFailure(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageFailure(RepoError::from(value))
    }
}

/// Parses a textual note/page/tag identifier.
pub fn parse_item_id(value: &str) -> EngineResult<Uuid> {
    parse_uuid_text(value)
        .ok_or_else(|| EngineError::ValidationFailed(format!("invalid identifier `{value}`")))
}

/// Parses an item type label (`note`, `memo`, `page`).
pub fn parse_item_type(value: &str) -> EngineResult<ItemType> {
    ItemType::parse(value)
        .ok_or_else(|| EngineError::ValidationFailed(format!("unknown item type `{value}`")))
}
