//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts (note, page, block, tag).
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - "Active" reads exclude rows with a `deleted_at` tombstone unless the
//!   caller asks for deleted rows explicitly.
//! - Repositories never open their own transactions; they run on whatever
//!   connection or transaction they were built on.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod block_repo;
pub mod feed_source;
pub mod note_repo;
pub mod page_repo;
pub mod tag_repo;

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target row is absent (or not in the state the mutation requires).
    NotFound { entity: &'static str, id: Uuid },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
    /// A JSON column could not be encoded.
    Serialization(serde_json::Error),
    /// A fetch worker or an external source failed to answer.
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Serialization(err) => write!(f, "serialization failed: {err}"),
            Self::Unavailable(message) => write!(f, "source unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// `?, ?, ?` with `count` placeholders for `IN (...)` lists.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
