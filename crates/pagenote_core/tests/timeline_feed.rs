use pagenote_core::db::open_db;
use pagenote_core::repo::feed_source::{
    NoteFeedEntry, NoteFeedSource, PageFeedEntry, PageFeedSource,
};
use pagenote_core::repo::{RepoError, RepoResult};
use pagenote_core::{
    BlockInput, BlockPayload, EngineError, FeedConfig, FeedItem, FeedService, ItemType,
    LifecycleService, NoteService, OwnerId, PageDraft, PageService, Viewer,
};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

fn create_note(conn: &mut Connection, owner: Uuid, content: &str, created_at: i64) -> Uuid {
    let note = NoteService::new(conn)
        .create_note(owner, content, Vec::new(), None)
        .unwrap();
    conn.execute(
        "UPDATE notes SET created_at = ?2 WHERE uuid = ?1;",
        rusqlite::params![note.uuid.to_string(), created_at],
    )
    .unwrap();
    note.uuid
}

fn create_page(
    conn: &mut Connection,
    owner: Uuid,
    title: &str,
    created_at: i64,
    blocks: Vec<BlockInput>,
) -> Uuid {
    let draft = PageDraft {
        title: title.to_string(),
        blocks,
        ..PageDraft::default()
    };
    let page_id = PageService::new(conn, 100)
        .save_composite(owner, None, &draft)
        .unwrap()
        .page_id;
    conn.execute(
        "UPDATE pages SET created_at = ?2 WHERE uuid = ?1;",
        rusqlite::params![page_id.to_string(), created_at],
    )
    .unwrap();
    page_id
}

fn shape(items: &[FeedItem]) -> Vec<(ItemType, i64)> {
    items
        .iter()
        .map(|item| match item {
            FeedItem::Note(note) => (ItemType::Note, note.created_at),
            FeedItem::Page(page) => (ItemType::Page, page.created_at),
        })
        .collect()
}

fn seeded_db(path: &Path, owner: Uuid) {
    let mut conn = open_db(path).unwrap();
    create_note(&mut conn, owner, "n30", 30);
    create_note(&mut conn, owner, "n20", 20);
    create_page(&mut conn, owner, "p25", 25, Vec::new());
    create_page(&mut conn, owner, "p10", 10, Vec::new());
}

#[tokio::test]
async fn owner_timeline_merges_both_streams_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let owner = Uuid::new_v4();
    seeded_db(&path, owner);

    let feed = FeedService::sqlite(&path, FeedConfig::default());
    let timeline = feed.get_timeline(Viewer::Owner(owner), 10, 0).await.unwrap();

    assert_eq!(
        shape(&timeline.items),
        vec![
            (ItemType::Note, 30),
            (ItemType::Page, 25),
            (ItemType::Note, 20),
            (ItemType::Page, 10),
        ]
    );
    assert_eq!(timeline.total, 4);
}

#[tokio::test]
async fn offset_past_merged_window_is_empty_but_reports_total() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let owner = Uuid::new_v4();
    seeded_db(&path, owner);

    let feed = FeedService::sqlite(&path, FeedConfig::default());
    let timeline = feed.get_timeline(Viewer::Owner(owner), 2, 4).await.unwrap();
    assert!(timeline.items.is_empty());
    assert_eq!(timeline.total, 4);

    let second = feed.get_timeline(Viewer::Owner(owner), 2, 2).await.unwrap();
    assert_eq!(
        shape(&second.items),
        vec![(ItemType::Note, 20), (ItemType::Page, 10)]
    );
}

#[tokio::test]
async fn anonymous_viewer_sees_only_shared_active_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();
    {
        let mut conn = open_db(&path).unwrap();
        create_note(&mut conn, owner, "private note", 50);
        let shared = create_page(&mut conn, owner, "shared", 40, Vec::new());
        let trashed = create_page(&mut conn, other, "trashed", 30, Vec::new());
        create_page(&mut conn, other, "private", 20, Vec::new());
        let foreign_shared = create_page(&mut conn, other, "other shared", 10, Vec::new());

        let mut pages = PageService::new(&mut conn, 100);
        pages.set_sharing(owner, shared, true).unwrap();
        pages.set_sharing(other, trashed, true).unwrap();
        pages.set_sharing(other, foreign_shared, true).unwrap();
        LifecycleService::new(&mut conn)
            .soft_delete(ItemType::Page, trashed, other)
            .unwrap();
    }

    let feed = FeedService::sqlite(&path, FeedConfig::default());
    let timeline = feed.get_timeline(Viewer::Anonymous, 10, 0).await.unwrap();
    let titles: Vec<&str> = timeline
        .items
        .iter()
        .map(|item| match item {
            FeedItem::Page(page) => page.title.as_str(),
            FeedItem::Note(_) => panic!("notes are never public"),
        })
        .collect();
    assert_eq!(titles, vec!["shared", "other shared"]);
    assert!(timeline.items.iter().all(|item| match item {
        FeedItem::Page(page) => page.share_token.is_some(),
        FeedItem::Note(_) => false,
    }));
}

#[tokio::test]
async fn page_entries_carry_up_to_four_block_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let owner = Uuid::new_v4();
    {
        let mut conn = open_db(&path).unwrap();
        let blocks = (0..6)
            .map(|idx| {
                BlockInput::new(
                    format!("img{idx}"),
                    "image",
                    BlockPayload::from_value(json!({ "file": { "url": format!("{idx}.png") } })),
                )
            })
            .collect();
        create_page(&mut conn, owner, "gallery", 1, blocks);
    }

    let feed = FeedService::sqlite(&path, FeedConfig::default());
    let timeline = feed.get_timeline(Viewer::Owner(owner), 0, 0).await.unwrap();
    match &timeline.items[0] {
        FeedItem::Page(page) => {
            assert_eq!(page.images, vec!["0.png", "1.png", "2.png", "3.png"]);
        }
        other => panic!("unexpected item: {other:?}"),
    }
}

struct RecordingNotes {
    called: AtomicBool,
}

impl NoteFeedSource for RecordingNotes {
    fn fetch_notes(&self, _owner: OwnerId, _limit: u32, _offset: u32) -> RepoResult<Vec<NoteFeedEntry>> {
        self.called.store(true, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

struct BrokenPages {
    panic: bool,
}

impl PageFeedSource for BrokenPages {
    fn fetch_pages(
        &self,
        _viewer: Viewer,
        _limit: u32,
        _offset: u32,
        _max_images: usize,
    ) -> RepoResult<Vec<PageFeedEntry>> {
        if self.panic {
            panic!("page source crashed");
        }
        Err(RepoError::InvalidData("broken page row".to_string()))
    }
}

#[tokio::test]
async fn failing_branch_fails_the_whole_timeline() {
    let notes = Arc::new(RecordingNotes {
        called: AtomicBool::new(false),
    });
    let feed = FeedService::new(
        Arc::clone(&notes),
        Arc::new(BrokenPages { panic: false }),
        FeedConfig::default(),
    );

    let err = feed
        .get_timeline(Viewer::Owner(Uuid::new_v4()), 10, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StorageFailure(RepoError::InvalidData(_))));
    assert!(notes.called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn panicking_branch_surfaces_as_storage_failure() {
    let feed = FeedService::new(
        Arc::new(RecordingNotes {
            called: AtomicBool::new(false),
        }),
        Arc::new(BrokenPages { panic: true }),
        FeedConfig::default(),
    );

    let err = feed
        .get_timeline(Viewer::Owner(Uuid::new_v4()), 10, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StorageFailure(RepoError::Unavailable(_))));
}
