//! Shared helpers for the SQL-level integration tests.

#![allow(dead_code)]

use std::sync::Once;

use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

static LOGGING: Once = Once::new();

/// Install a test-writer fmt subscriber once per test binary.
///
/// Defaults to `warn`; `RUST_LOG` overrides.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// In-memory connection with the extension installed.
pub fn connection() -> Connection {
    init_logging();
    let conn = Connection::open_in_memory().expect("open in-memory db");
    sqlicu::install(&conn).expect("install extension");
    conn
}

/// `words(w TEXT)` filled with `values`.
pub fn with_words(conn: &Connection, values: &[&str]) {
    conn.execute("CREATE TABLE words(w TEXT)", []).expect("create table");
    let mut insert = conn.prepare("INSERT INTO words VALUES (?1)").expect("prepare insert");
    for value in values {
        insert.execute([value]).expect("insert");
    }
}

/// Rows of `words` ordered by `COLLATE collation`.
pub fn sorted(conn: &Connection, collation: &str) -> Vec<String> {
    let sql = format!("SELECT w FROM words ORDER BY w COLLATE {collation}");
    let mut stmt = conn.prepare(&sql).expect("prepare select");
    stmt.query_map([], |row| row.get(0))
        .expect("query")
        .collect::<rusqlite::Result<Vec<String>>>()
        .expect("rows")
}

/// `SELECT icu_load_collation(...)` with the given arguments.
pub fn load(conn: &Connection, locale: &str, name: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT icu_load_collation(?1, ?2)",
        [locale, name],
        |row| row.get(0),
    )
}
