use std::path::Path;

use rusqlite::Connection;

use super::migrate::ensure_all_tables;
use super::DatabaseError;

/// Open a SQLite connection to the given path and bring every table up to
/// the catalog's shape before returning. Migration failure for any table
/// aborts the open — the store never serves an inconsistent schema.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let mut conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    ensure_all_tables(&mut conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let mut conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    ensure_all_tables(&mut conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // 7 catalog tables + schema_versions = 8
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 8, "Expected 8 tables, got {count}");
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn clinic_settings_singleton_seeded_with_defaults() {
        let conn = open_memory_database().unwrap();
        let (name, header): (String, String) = conn
            .query_row(
                "SELECT clinic_name, header_text FROM clinic_settings WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(name, "Medical Clinic");
        assert_eq!(header, "Specialized Medical Clinic");
    }

    #[test]
    fn database_opens_from_disk_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");

        {
            let conn = open_database(&path).unwrap();
            conn.execute("INSERT INTO patients (name) VALUES ('Ahmed')", [])
                .unwrap();
        }

        // Re-open: migration barrier is idempotent, data survives.
        let conn = open_database(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
