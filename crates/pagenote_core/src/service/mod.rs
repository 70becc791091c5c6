//! Engine use-cases.
//!
//! # Responsibility
//! - Orchestrate repositories inside transaction scopes.
//! - Enforce ownership and map storage failures onto [`error::EngineError`].
//!
//! # Invariants
//! - Multi-row writes go through `db::with_transaction`; a failed use-case
//!   leaves no partial state behind.

pub mod error;
pub mod feed_service;
pub mod lifecycle_service;
pub mod note_service;
pub mod page_service;
pub mod search_service;
pub mod tag_resolver;
