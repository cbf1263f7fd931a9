// Database queries: all SQL touching the seen-showings table.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::SeenShowing;

/// True if this fingerprint has already been recorded.
pub fn seen_exists(conn: &Connection, fingerprint: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM seen_showings WHERE fingerprint = ?1",
            params![fingerprint],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Record a fingerprint. A duplicate is a no-op: the original
/// first_seen_at is kept.
pub fn insert_seen(conn: &Connection, fingerprint: &str, first_seen_at: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO seen_showings (fingerprint, first_seen_at) VALUES (?1, ?2)",
        params![fingerprint, first_seen_at],
    )?;
    Ok(())
}

pub fn seen_count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM seen_showings", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

/// Most recently recorded fingerprints, newest first.
pub fn recent_seen(conn: &Connection, limit: u32) -> Result<Vec<SeenShowing>> {
    let mut stmt = conn.prepare(
        "SELECT fingerprint, first_seen_at FROM seen_showings
         ORDER BY first_seen_at DESC, fingerprint ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(SeenShowing {
                fingerprint: row.get(0)?,
                first_seen_at: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_then_exists() {
        let conn = test_db();
        assert!(!seen_exists(&conn, "Jane|May 4|Zillow").unwrap());
        insert_seen(&conn, "Jane|May 4|Zillow", "2026-05-04T10:00:00Z").unwrap();
        assert!(seen_exists(&conn, "Jane|May 4|Zillow").unwrap());
        assert!(!seen_exists(&conn, "Jane|May 5|Zillow").unwrap());
    }

    #[test]
    fn test_duplicate_insert_keeps_first_timestamp() {
        let conn = test_db();
        insert_seen(&conn, "a|b|c", "2026-01-01T00:00:00Z").unwrap();
        insert_seen(&conn, "a|b|c", "2026-02-01T00:00:00Z").unwrap();
        assert_eq!(seen_count(&conn).unwrap(), 1);
        let rows = recent_seen(&conn, 10).unwrap();
        assert_eq!(rows[0].first_seen_at, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let conn = test_db();
        insert_seen(&conn, "old", "2026-01-01T00:00:00Z").unwrap();
        insert_seen(&conn, "mid", "2026-02-01T00:00:00Z").unwrap();
        insert_seen(&conn, "new", "2026-03-01T00:00:00Z").unwrap();
        let rows = recent_seen(&conn, 2).unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.fingerprint.as_str()).collect();
        assert_eq!(keys, vec!["new", "mid"]);
    }
}
