use pagenote_core::db::open_db_in_memory;
use pagenote_core::{
    BlockInput, BlockPayload, EngineError, PageDraft, PageService, Viewer,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn block(id: &str, kind: &str, data: serde_json::Value) -> BlockInput {
    BlockInput::new(id, kind, BlockPayload::from_value(data))
}

fn paragraph(id: &str, text: &str) -> BlockInput {
    block(id, "paragraph", json!({ "text": text }))
}

fn draft(title: &str, tags: &[&str], blocks: Vec<BlockInput>) -> PageDraft {
    PageDraft {
        title: title.to_string(),
        cover: "cover.png".to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        blocks,
    }
}

fn block_rows(conn: &Connection, page_id: Uuid) -> Vec<(String, i64)> {
    let mut stmt = conn
        .prepare("SELECT block_id, sort_order FROM blocks WHERE page_uuid = ?1 ORDER BY sort_order;")
        .unwrap();
    let rows = stmt
        .query_map([page_id.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn create_persists_header_blocks_summary_and_tags() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let blocks = vec![
        block("h", "header", json!({ "text": "Heading", "level": 2 })),
        paragraph("p1", "  Intro paragraph  "),
        paragraph("p2", "Second paragraph"),
    ];

    let saved = PageService::new(&mut conn, 100)
        .save_composite(owner, None, &draft("Trip", &["travel", " travel ", "2024"], blocks))
        .unwrap();
    assert_eq!(saved.created_at, saved.updated_at);

    let view = PageService::new(&mut conn, 100)
        .get_page(Viewer::Owner(owner), saved.page_id)
        .unwrap();
    assert_eq!(view.page.title, "Trip");
    assert_eq!(view.page.cover, "cover.png");
    assert_eq!(view.page.summary, "Intro paragraph");
    assert_eq!(view.page.tag_names(), vec!["travel", "2024"]);
    let ids: Vec<&str> = view.blocks.iter().map(|b| b.block_id.as_str()).collect();
    assert_eq!(ids, vec!["h", "p1", "p2"]);
    assert_eq!(view.blocks[0].data.get("level"), Some(&json!(2)));
}

#[test]
fn update_replaces_blocks_and_tags_physically() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let saved = PageService::new(&mut conn, 100)
        .save_composite(
            owner,
            None,
            &draft(
                "v1",
                &["old"],
                vec![paragraph("A", "a"), paragraph("B", "b"), paragraph("C", "c")],
            ),
        )
        .unwrap();

    let updated = PageService::new(&mut conn, 100)
        .save_composite(
            owner,
            Some(saved.page_id),
            &draft("v2", &["new"], vec![paragraph("X", "x"), paragraph("Y", "y")]),
        )
        .unwrap();
    assert_eq!(updated.page_id, saved.page_id);
    assert_eq!(updated.created_at, saved.created_at);
    assert!(updated.updated_at >= saved.updated_at);

    assert_eq!(
        block_rows(&conn, saved.page_id),
        vec![("X".to_string(), 0), ("Y".to_string(), 1)]
    );
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM blocks;"), 2);

    let view = PageService::new(&mut conn, 100)
        .get_page(Viewer::Owner(owner), saved.page_id)
        .unwrap();
    assert_eq!(view.page.title, "v2");
    assert_eq!(view.page.summary, "x");
    assert_eq!(view.page.tag_names(), vec!["new"]);
}

#[test]
fn update_by_another_owner_is_denied_and_changes_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let saved = PageService::new(&mut conn, 100)
        .save_composite(owner, None, &draft("mine", &["a"], vec![paragraph("A", "a")]))
        .unwrap();

    let err = PageService::new(&mut conn, 100)
        .save_composite(
            Uuid::new_v4(),
            Some(saved.page_id),
            &draft("stolen", &["b"], vec![paragraph("Z", "z")]),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied { kind: "page", .. }));

    let (title, updated_at): (String, i64) = conn
        .query_row(
            "SELECT title, updated_at FROM pages WHERE uuid = ?1;",
            [saved.page_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(title, "mine");
    assert_eq!(updated_at, saved.updated_at);
    assert_eq!(block_rows(&conn, saved.page_id), vec![("A".to_string(), 0)]);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tags;"), 1);
}

#[test]
fn update_of_unknown_page_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let err = PageService::new(&mut conn, 100)
        .save_composite(Uuid::new_v4(), Some(Uuid::new_v4()), &PageDraft::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "page", .. }));
}

#[test]
fn duplicate_block_ids_are_rejected_before_any_write() {
    let mut conn = open_db_in_memory().unwrap();
    let err = PageService::new(&mut conn, 100)
        .save_composite(
            Uuid::new_v4(),
            None,
            &draft("dup", &["t"], vec![paragraph("A", "a"), paragraph("A", "b")]),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::ValidationFailed(_)));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM pages;"), 0);
}

#[test]
fn failure_in_tag_association_rolls_back_the_whole_save() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_page_tags BEFORE INSERT ON page_tags
         BEGIN
            SELECT RAISE(ABORT, 'page_tags disabled');
         END;",
    )
    .unwrap();

    let err = PageService::new(&mut conn, 100)
        .save_composite(
            Uuid::new_v4(),
            None,
            &draft("doomed", &["lost"], vec![paragraph("A", "a")]),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::StorageFailure(_)));

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM pages;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM blocks;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM tags;"), 0);
}

#[test]
fn summary_is_cut_to_the_configured_length() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let long = "字".repeat(150);
    let saved = PageService::new(&mut conn, 100)
        .save_composite(
            owner,
            None,
            &draft("long", &[], vec![block("img", "image", json!({"url": "a.png"})), paragraph("p", &long)]),
        )
        .unwrap();

    let view = PageService::new(&mut conn, 100)
        .get_page(Viewer::Owner(owner), saved.page_id)
        .unwrap();
    assert_eq!(view.page.summary.chars().count(), 100);
}

#[test]
fn nested_payload_survives_storage_in_key_order() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let data = json!({
        "z": [1, 2.5, null, true],
        "a": { "file": { "url": "img.png" }, "caption": "" }
    });
    let saved = PageService::new(&mut conn, 100)
        .save_composite(owner, None, &draft("payload", &[], vec![block("i", "image", data.clone())]))
        .unwrap();

    let stored: String = conn
        .query_row(
            "SELECT data FROM blocks WHERE page_uuid = ?1;",
            [saved.page_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, serde_json::to_string(&data).unwrap());

    let view = PageService::new(&mut conn, 100)
        .get_page(Viewer::Owner(owner), saved.page_id)
        .unwrap();
    assert_eq!(serde_json::to_value(&view.blocks[0].data).unwrap(), data);
}

#[test]
fn sharing_controls_anonymous_access_and_token_lifetime() {
    let mut conn = open_db_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let saved = PageService::new(&mut conn, 100)
        .save_composite(owner, None, &draft("shared", &[], vec![paragraph("p", "hello")]))
        .unwrap();

    let mut service = PageService::new(&mut conn, 100);
    let denied = service.get_page(Viewer::Anonymous, saved.page_id).unwrap_err();
    assert!(matches!(denied, EngineError::PermissionDenied { .. }));

    let shared = service.set_sharing(owner, saved.page_id, true).unwrap();
    let token = shared.token.clone().unwrap();
    assert_eq!(shared.link, Some(format!("/s/{token}")));
    let again = service.set_sharing(owner, saved.page_id, true).unwrap();
    assert_eq!(again.token.as_deref(), Some(token.as_str()));

    assert_eq!(service.get_page(Viewer::Anonymous, saved.page_id).unwrap().blocks.len(), 1);
    let by_token = service.get_page_by_share_token(&token).unwrap();
    assert_eq!(by_token.page.uuid, saved.page_id);

    let foreign = service.set_sharing(Uuid::new_v4(), saved.page_id, false).unwrap_err();
    assert!(matches!(foreign, EngineError::PermissionDenied { .. }));

    let private = service.set_sharing(owner, saved.page_id, false).unwrap();
    assert_eq!(private.token, None);
    assert_eq!(private.link, None);
    let revoked = service.get_page_by_share_token(&token).unwrap_err();
    assert!(matches!(revoked, EngineError::NotFound { kind: "shared page", .. }));

    let renewed = service.set_sharing(owner, saved.page_id, true).unwrap();
    assert_ne!(renewed.token.as_deref(), Some(token.as_str()));
}

#[test]
fn share_token_lookup_separates_blank_from_unknown() {
    let mut conn = open_db_in_memory().unwrap();
    let service = PageService::new(&mut conn, 100);

    let blank = service.get_page_by_share_token("   ").unwrap_err();
    assert!(matches!(blank, EngineError::ValidationFailed(_)));

    let unknown = service.get_page_by_share_token("no-such-token").unwrap_err();
    assert_eq!(unknown.code(), "not_found");
    assert!(
        matches!(unknown, EngineError::NotFound { kind: "shared page", ref id } if id == "no-such-token")
    );
}
