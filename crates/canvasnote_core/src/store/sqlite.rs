//! SQLite-backed storage for concepts and settings.
//!
//! # Responsibility
//! - Persist serialized concept/settings rows durably across restarts.
//! - Apply each flush batch and the initial bulk load in one transaction.
//!
//! # Invariants
//! - The connection is migrated to the latest schema before use.
//! - `initialized` and `data_version` live in the `meta` table.
//! - A batch issued while the connection is already inside a transaction
//!   runs in a savepoint, so its failure never leaks into the outer one.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::concept::ConceptId;
use crate::store::backend::{
    BackendError, BackendResult, SerializedConcept, StorageBackend, WriteOp,
};

const META_INITIALIZED: &str = "initialized";
const META_DATA_VERSION: &str = "data_version";
const META_LAST_UPDATED: &str = "last_updated";

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> BackendResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps an existing connection that must already be migrated.
    pub fn try_from_connection(conn: Connection) -> BackendResult<Self> {
        let actual_version = current_user_version(&conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(BackendError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn read_meta(&self, key: &str) -> BackendResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1;", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn is_initialized(&self) -> BackendResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM meta WHERE key = ?1);",
            [META_INITIALIZED],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn initialize(
        &mut self,
        settings_json: &str,
        concepts: &[SerializedConcept],
        data_version: u32,
        now_ms: i64,
    ) -> BackendResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        put_settings(&tx, settings_json)?;
        for concept in concepts {
            put_concept(&tx, concept, now_ms)?;
        }
        put_meta(&tx, META_DATA_VERSION, &data_version.to_string())?;
        put_meta(&tx, META_LAST_UPDATED, &now_ms.to_string())?;
        put_meta(&tx, META_INITIALIZED, "1")?;
        tx.commit()?;
        Ok(())
    }

    fn read_concept(&self, id: ConceptId) -> BackendResult<Option<String>> {
        let data = self
            .conn
            .query_row(
                "SELECT data FROM concepts WHERE id = ?1;",
                [id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(data)
    }

    fn read_all_concepts(&self) -> BackendResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM concepts ORDER BY rowid ASC;")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    fn read_settings(&self) -> BackendResult<Option<String>> {
        let data = self
            .conn
            .query_row("SELECT data FROM settings WHERE id = 1;", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(data)
    }

    fn write_batch(&mut self, ops: &[WriteOp], now_ms: i64) -> BackendResult<()> {
        if self.conn.is_autocommit() {
            let tx = self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)?;
            apply_ops(&tx, ops, now_ms)?;
            tx.commit()?;
        } else {
            let savepoint = self.conn.savepoint()?;
            apply_ops(&savepoint, ops, now_ms)?;
            savepoint.commit()?;
        }
        Ok(())
    }

    fn read_version(&self) -> BackendResult<Option<u32>> {
        match self.read_meta(META_DATA_VERSION)? {
            Some(value) => value.parse().map(Some).map_err(|_| {
                BackendError::Corrupt(format!("invalid data_version `{value}` in meta"))
            }),
            None => Ok(None),
        }
    }

    fn write_version(&mut self, version: u32) -> BackendResult<()> {
        put_meta(&self.conn, META_DATA_VERSION, &version.to_string())
    }

    fn read_last_updated(&self) -> BackendResult<Option<i64>> {
        match self.read_meta(META_LAST_UPDATED)? {
            Some(value) => value.parse().map(Some).map_err(|_| {
                BackendError::Corrupt(format!("invalid last_updated `{value}` in meta"))
            }),
            None => Ok(None),
        }
    }
}

fn apply_ops(conn: &Connection, ops: &[WriteOp], now_ms: i64) -> BackendResult<()> {
    for op in ops {
        match op {
            WriteOp::PutConcept(concept) => put_concept(conn, concept, now_ms)?,
            WriteOp::PutSettings(json) => put_settings(conn, json)?,
        }
    }
    put_meta(conn, META_LAST_UPDATED, &now_ms.to_string())
}

fn put_concept(conn: &Connection, concept: &SerializedConcept, now_ms: i64) -> BackendResult<()> {
    conn.execute(
        "INSERT INTO concepts (id, kind, data, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            kind = excluded.kind,
            data = excluded.data,
            updated_at = excluded.updated_at;",
        params![
            concept.id.to_string(),
            concept.kind.as_str(),
            concept.json.as_str(),
            now_ms
        ],
    )?;
    Ok(())
}

fn put_settings(conn: &Connection, json: &str) -> BackendResult<()> {
    conn.execute(
        "INSERT INTO settings (id, data) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data;",
        [json],
    )?;
    Ok(())
}

fn put_meta(conn: &Connection, key: &str, value: &str) -> BackendResult<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SqliteBackend;
    use crate::store::backend::{SerializedConcept, StorageBackend, WriteOp};
    use rusqlite::Connection;
    use uuid::Uuid;

    fn row(id: Uuid, json: &str) -> SerializedConcept {
        SerializedConcept {
            id,
            kind: "text".to_string(),
            json: json.to_string(),
        }
    }

    #[test]
    fn fresh_database_is_not_initialized() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(!backend.is_initialized().unwrap());
        assert_eq!(backend.read_version().unwrap(), None);
        assert_eq!(backend.read_settings().unwrap(), None);
    }

    #[test]
    fn initialize_twice_overwrites_rows() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        backend
            .initialize("{}", &[row(id, "\"first\"")], 1, 10)
            .unwrap();
        backend
            .initialize("{}", &[row(id, "\"second\"")], 1, 20)
            .unwrap();

        let count: i64 = backend
            .connection()
            .query_row("SELECT COUNT(*) FROM concepts;", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(backend.read_concept(id).unwrap().as_deref(), Some("\"second\""));
        assert!(backend.is_initialized().unwrap());
    }

    #[test]
    fn batch_inside_open_transaction_uses_savepoint() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        backend.connection().execute_batch("BEGIN;").unwrap();
        let id = Uuid::new_v4();
        backend
            .write_batch(&[WriteOp::PutConcept(row(id, "{}"))], 5)
            .unwrap();
        backend.connection().execute_batch("COMMIT;").unwrap();

        assert!(backend.read_concept(id).unwrap().is_some());
        assert_eq!(backend.read_last_updated().unwrap(), Some(5));
    }

    #[test]
    fn rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteBackend::try_from_connection(conn).is_err());
    }
}
