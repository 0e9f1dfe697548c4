//! Schema migrator — brings live tables up to the catalog's shape before
//! anything else touches them.
//!
//! Runs once per open as a startup barrier. A `schema_versions` table
//! records the catalog version last verified for each table, so the
//! column diff only runs when a table is actually stale. When columns are
//! missing, the table is rebuilt through a backup-recreate-restore
//! sequence that verifies row counts at every checkpoint; the original
//! table is never dropped until the backup copy is proven complete.

use rusqlite::Connection;

use super::schema::{TableSpec, CATALOG};
use super::DatabaseError;

/// Probe result for a live table. Explicit, never a swallowed error: a
/// malformed table surfaces as `MigrationFailed` from [`probe_table`],
/// distinguishable from "nothing to do".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableState {
    Absent,
    Present(Vec<String>),
}

/// What `ensure_schema` did for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Table did not exist; created fresh from the catalog.
    Created,
    /// Recorded version current, or columns already a superset.
    UpToDate,
    /// Backup-recreate-restore performed.
    Migrated {
        rows: u64,
        added_columns: Vec<String>,
    },
}

/// Read a live table's state from sqlite_master and PRAGMA table_info.
pub fn probe_table(conn: &Connection, table: &str) -> Result<TableState, DatabaseError> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(TableState::Absent);
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(DatabaseError::MigrationFailed {
            table: table.to_string(),
            reason: "table exists but reports no columns".to_string(),
        });
    }
    Ok(TableState::Present(columns))
}

/// Make one table's columns a superset of its catalog spec.
///
/// Idempotent: a table at the recorded catalog version returns
/// [`MigrationOutcome::UpToDate`] without touching data. The version
/// counter advances only after the table is verified to match the spec.
pub fn ensure_schema(
    conn: &mut Connection,
    spec: &TableSpec,
) -> Result<MigrationOutcome, DatabaseError> {
    ensure_version_table(conn)?;

    if recorded_version(conn, spec.name)? >= spec.version {
        return Ok(MigrationOutcome::UpToDate);
    }

    match probe_table(conn, spec.name)? {
        TableState::Absent => {
            let tx = conn.transaction()?;
            tx.execute_batch(&spec.create_sql())?;
            record_version(&tx, spec)?;
            tx.commit()?;
            tracing::info!(table = spec.name, version = spec.version, "created table");
            Ok(MigrationOutcome::Created)
        }
        TableState::Present(columns) => {
            let missing: Vec<&str> = spec
                .column_names()
                .filter(|c| !columns.iter().any(|have| have == c))
                .collect();

            if missing.is_empty() {
                // Columns already a superset (database predates version
                // stamping); stamp and move on.
                let tx = conn.transaction()?;
                record_version(&tx, spec)?;
                tx.commit()?;
                return Ok(MigrationOutcome::UpToDate);
            }

            tracing::info!(table = spec.name, missing = ?missing, "evolving table");
            rebuild_table(conn, spec, &columns).map_err(|e| into_migration_error(spec, e))
        }
    }
}

/// Startup barrier: ensure every catalog table, then seed the
/// clinic_settings singleton. Must complete before the store serves any
/// other operation.
pub fn ensure_all_tables(conn: &mut Connection) -> Result<(), DatabaseError> {
    ensure_version_table(conn)?;
    for spec in CATALOG {
        ensure_schema(conn, spec)?;
    }
    conn.execute("INSERT OR IGNORE INTO clinic_settings (id) VALUES (1)", [])?;
    Ok(())
}

fn ensure_version_table(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_versions (
            table_name TEXT PRIMARY KEY,
            version INTEGER NOT NULL
        )",
    )?;
    Ok(())
}

fn recorded_version(conn: &Connection, table: &str) -> Result<i64, DatabaseError> {
    let version = conn
        .query_row(
            "SELECT version FROM schema_versions WHERE table_name = ?1",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(0),
            other => Err(other),
        })?;
    Ok(version)
}

fn record_version(conn: &Connection, spec: &TableSpec) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO schema_versions (table_name, version) VALUES (?1, ?2)
         ON CONFLICT(table_name) DO UPDATE SET version = excluded.version",
        rusqlite::params![spec.name, spec.version],
    )?;
    Ok(())
}

/// Backup-recreate-restore. Foreign key enforcement is suspended for the
/// rebuild (a parent table cannot otherwise be dropped while children
/// reference it) and restored afterwards; the data movement itself runs
/// in one transaction.
fn rebuild_table(
    conn: &mut Connection,
    spec: &TableSpec,
    existing: &[String],
) -> Result<MigrationOutcome, DatabaseError> {
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    let outcome = rebuild_in_tx(conn, spec, existing);
    conn.pragma_update(None, "foreign_keys", "ON")?;
    outcome
}

fn rebuild_in_tx(
    conn: &mut Connection,
    spec: &TableSpec,
    existing: &[String],
) -> Result<MigrationOutcome, DatabaseError> {
    let tx = conn.transaction()?;
    let backup = spec.backup_name();

    // Leftover holding table from an interrupted pre-transactional run.
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {backup}"))?;

    let source_rows: i64 =
        tx.query_row(&format!("SELECT COUNT(*) FROM {}", spec.name), [], |row| {
            row.get(0)
        })?;

    tx.execute_batch(&format!(
        "CREATE TABLE {backup} AS SELECT * FROM {}",
        spec.name
    ))?;

    // Checkpoint: the original is not dropped until the backup is proven
    // complete.
    let backup_rows: i64 =
        tx.query_row(&format!("SELECT COUNT(*) FROM {backup}"), [], |row| {
            row.get(0)
        })?;
    if backup_rows != source_rows {
        return Err(DatabaseError::MigrationFailed {
            table: spec.name.to_string(),
            reason: format!(
                "backup copy holds {backup_rows} rows, expected {source_rows}; original left untouched"
            ),
        });
    }

    tx.execute_batch(&format!("DROP TABLE {}", spec.name))?;
    tx.execute_batch(&spec.create_sql())?;

    // Carry forward every column present in both shapes; new columns keep
    // their declared defaults.
    let carried: Vec<&str> = spec
        .column_names()
        .filter(|c| existing.iter().any(|have| have == c))
        .collect();
    let column_list = carried.join(", ");
    tx.execute_batch(&format!(
        "INSERT INTO {} ({column_list}) SELECT {column_list} FROM {backup}",
        spec.name
    ))?;

    let restored_rows: i64 =
        tx.query_row(&format!("SELECT COUNT(*) FROM {}", spec.name), [], |row| {
            row.get(0)
        })?;
    if restored_rows != source_rows {
        // Transaction rolls back on drop; the original table survives.
        return Err(DatabaseError::MigrationFailed {
            table: spec.name.to_string(),
            reason: format!("restored {restored_rows} rows, expected {source_rows}"),
        });
    }

    tx.execute_batch(&format!("DROP TABLE {backup}"))?;
    record_version(&tx, spec)?;
    tx.commit()?;

    let added_columns: Vec<String> = spec
        .column_names()
        .filter(|c| !existing.iter().any(|have| have == c))
        .map(String::from)
        .collect();
    tracing::info!(
        table = spec.name,
        rows = source_rows,
        added = ?added_columns,
        "table migrated"
    );
    Ok(MigrationOutcome::Migrated {
        rows: source_rows as u64,
        added_columns,
    })
}

fn into_migration_error(spec: &TableSpec, err: DatabaseError) -> DatabaseError {
    match err {
        e @ DatabaseError::MigrationFailed { .. } => e,
        other => DatabaseError::MigrationFailed {
            table: spec.name.to_string(),
            reason: other.to_string(),
        },
    }
}
