// Database schema: versioned migrations.
//
// `schema_version` records each applied migration. Migrations run in order,
// each in its own transaction together with its version row.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

/// (version, SQL) in application order.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "
    -- One row per showing we have already alerted on.
    -- fingerprint is name|showing date|source, feedback excluded.
    CREATE TABLE seen_showings (
        fingerprint TEXT PRIMARY KEY,
        first_seen_at TEXT NOT NULL
    );

    CREATE INDEX idx_seen_first_seen ON seen_showings(first_seen_at);
    ",
)];

/// Bring the schema up to date. Runs on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("Failed to create schema_version table")?;

    for (version, sql) in MIGRATIONS {
        run_migration(conn, *version, sql)?;
    }
    Ok(())
}

/// Highest applied migration, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn run_migration(conn: &Connection, version: i64, sql: &str) -> Result<()> {
    let applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;
    if applied {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)
        .with_context(|| format!("Migration v{version} failed"))?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    tx.commit()?;
    info!(version, "Applied schema migration");
    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        assert_eq!(table_count(&conn).unwrap(), 2);

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
        assert_eq!(current_version(&conn).unwrap(), 1);
    }

    #[test]
    fn applied_migration_is_not_rerun() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO seen_showings (fingerprint, first_seen_at) VALUES ('a|b|c', 'now')",
            [],
        )
        .unwrap();

        // v1 has no IF NOT EXISTS, so a rerun would fail here.
        create_tables(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM seen_showings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn failed_migration_leaves_no_version_row() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let err = run_migration(&conn, 2, "CREATE TABLE broken (;").unwrap_err();
        assert!(err.to_string().contains("Migration v2 failed"));
        assert_eq!(current_version(&conn).unwrap(), 1);
    }
}
