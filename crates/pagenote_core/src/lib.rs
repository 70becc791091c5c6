//! Content aggregation and lifecycle engine for notes and block pages.
//! This crate is the single source of truth for storage invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, CoreConfig, FeedConfig};
pub use db::{open_db, open_db_in_memory, with_transaction, DbError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::block::{Block, BlockInput, BlockPayload};
pub use model::item::{ItemType, NoteId, OwnerId, PageId, TagId, Viewer};
pub use model::note::Note;
pub use model::page::{Page, Sharing};
pub use model::tag::Tag;
pub use repo::{RepoError, RepoResult};
pub use search::{SearchBackend, SearchError, SearchHit};
pub use service::error::{parse_item_id, parse_item_type, EngineError, EngineResult};
pub use service::feed_service::{FeedItem, FeedService, Timeline};
pub use service::lifecycle_service::{LifecycleService, TrashItem, TrashListing};
pub use service::note_service::NoteService;
pub use service::page_service::{PageDraft, PageService, PageView, SavedPage, ShareState};
pub use service::search_service::{SearchResponse, SearchResultItem, SearchService};
pub use service::tag_resolver::{TagResolver, TagService};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
