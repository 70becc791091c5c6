use pagenote_core::db::migrations::latest_version;
use pagenote_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["notes", "pages", "blocks", "tags", "note_tags", "page_tags"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pagenote.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "blocks");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn page_row_cannot_be_removed_while_blocks_reference_it() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO pages (uuid, owner_id, created_at, updated_at) VALUES ('p1', 'o1', 1, 1);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO blocks (page_uuid, block_id, type, sort_order, created_at)
         VALUES ('p1', 'b1', 'paragraph', 0, 1);",
        [],
    )
    .unwrap();

    let err = conn
        .execute("DELETE FROM pages WHERE uuid = 'p1';", [])
        .unwrap_err();
    assert!(DbError::from(err).is_constraint_violation());
}

#[test]
fn tag_names_are_unique_per_owner_only() {
    let conn = open_db_in_memory().unwrap();
    let insert = "INSERT INTO tags (uuid, owner_id, name, created_at) VALUES (?1, ?2, ?3, 1);";
    conn.execute(insert, params!["t1", "owner-a", "rust"]).unwrap();
    conn.execute(insert, params!["t2", "owner-b", "rust"]).unwrap();

    let err = conn
        .execute(insert, params!["t3", "owner-a", "rust"])
        .unwrap_err();
    assert!(DbError::from(err).is_constraint_violation());
}

#[test]
fn block_sort_order_is_unique_within_a_page() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO pages (uuid, owner_id, created_at, updated_at) VALUES ('p1', 'o1', 1, 1);",
        [],
    )
    .unwrap();
    let insert = "INSERT INTO blocks (page_uuid, block_id, type, sort_order, created_at)
                  VALUES ('p1', ?1, 'paragraph', ?2, 1);";
    conn.execute(insert, params!["a", 0]).unwrap();

    assert!(conn.execute(insert, params!["b", 0]).is_err());
    assert!(conn.execute(insert, params!["a", 1]).is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
