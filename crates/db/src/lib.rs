//! SQLite connection factory and migration runner.
//!
//! Every connection returned from here has `foreign_keys=ON` and all module
//! migrations applied. Applied migrations are tracked per `(module, id)` in
//! `schema_migrations`, so reopening an existing database is idempotent.

use std::path::Path;
use std::time::{Duration, Instant};

use catalog_kernel::Migration;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// Opens (or creates) a database file and applies pending migrations.
pub fn open(path: impl AsRef<Path>, migrations: &[(String, Migration)]) -> DbResult<Connection> {
    let started_at = Instant::now();
    let path = path.as_ref();
    tracing::info!(target: "catalog-db", path = %path.display(), "opening database");

    let mut conn = Connection::open(path)?;
    bootstrap(&mut conn, migrations).inspect_err(|err| {
        tracing::error!(target: "catalog-db", error = %err, "database bootstrap failed");
    })?;

    tracing::info!(
        target: "catalog-db",
        duration_ms = started_at.elapsed().as_millis() as u64,
        "database ready"
    );
    Ok(conn)
}

/// Opens a private in-memory database and applies all migrations.
pub fn open_in_memory(migrations: &[(String, Migration)]) -> DbResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    bootstrap(&mut conn, migrations)?;
    tracing::debug!(target: "catalog-db", "in-memory database ready");
    Ok(conn)
}

fn bootstrap(conn: &mut Connection, migrations: &[(String, Migration)]) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn, migrations)?;
    Ok(())
}

/// Applies every migration not yet recorded, in the order given, inside one transaction.
///
/// Returns the number of migrations executed.
pub fn apply_migrations(
    conn: &mut Connection,
    migrations: &[(String, Migration)],
) -> DbResult<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            module     TEXT NOT NULL,
            id         TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            PRIMARY KEY (module, id)
        );",
    )?;

    let tx = conn.transaction()?;
    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM schema_migrations WHERE module = ?1 AND id = ?2;",
                params![module, migration.id],
                |row| row.get(0),
            )
            .optional()?;
        if already.is_some() {
            continue;
        }

        tx.execute_batch(migration.up)
            .map_err(|source| DbError::Migration {
                module: module.clone(),
                id: migration.id,
                source,
            })?;
        tx.execute(
            "INSERT INTO schema_migrations (module, id) VALUES (?1, ?2);",
            params![module, migration.id],
        )?;

        tracing::info!(target: "catalog-db", module = %module, id = migration.id, "applied migration");
        applied += 1;
    }
    tx.commit()?;

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrations() -> Vec<(String, Migration)> {
        vec![
            (
                "shelves".to_string(),
                Migration {
                    id: "001_init",
                    up: "CREATE TABLE shelves (id TEXT PRIMARY KEY);",
                },
            ),
            (
                "shelves".to_string(),
                Migration {
                    id: "002_slots",
                    up: "CREATE TABLE slots (
                        id       TEXT PRIMARY KEY,
                        shelf_id TEXT NOT NULL REFERENCES shelves(id)
                    );",
                },
            ),
        ]
    }

    #[test]
    fn in_memory_database_has_foreign_keys_enabled() {
        let conn = open_in_memory(&migrations()).unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);

        let err = conn
            .execute("INSERT INTO slots (id, shelf_id) VALUES ('s1', 'missing');", [])
            .unwrap_err();
        assert!(err.to_string().contains("FOREIGN KEY"));
    }

    #[test]
    fn reapplying_migrations_is_a_no_op() {
        let mut conn = open_in_memory(&migrations()).unwrap();
        assert_eq!(apply_migrations(&mut conn, &migrations()).unwrap(), 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn failing_migration_names_its_module_and_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut broken = migrations();
        broken.push((
            "shelves".to_string(),
            Migration {
                id: "003_broken",
                up: "CREATE TABLE ???;",
            },
        ));

        let err = apply_migrations(&mut conn, &broken).unwrap_err();
        assert!(err.to_string().contains("shelves/003_broken"));

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'shelves';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }
}
