//! Domain model for notes, block-structured pages and owner-scoped tags.
//!
//! # Responsibility
//! - Define canonical records used by repositories and services.
//! - Keep the JSON-only block payload boundary in one place.
//!
//! # Invariants
//! - Every note/page/tag is identified by a stable UUID.
//! - Deletion is a `deleted_at` tombstone until an explicit purge.

pub mod block;
pub mod item;
pub mod note;
pub mod page;
pub mod tag;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current server clock as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
