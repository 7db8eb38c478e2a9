//! SQLite-backed relational store.
//!
//! A single connection sits behind a mutex; callers in async contexts run
//! store operations on the blocking pool. Foreign keys are enabled per
//! connection so the schema's `ON DELETE CASCADE` clauses take effect.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, Transaction};

use crate::error::{OnboardError, Result};
use crate::migrations;

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open or create the database at `path` and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::apply(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        f(&conn)
    }

    /// Run `f` inside a transaction, committing if it returns `Ok`.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// True if `err` is a UNIQUE violation on `table.column`.
pub fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == ErrorCode::ConstraintViolation
                && msg.contains("UNIQUE")
                && msg.contains(column)
        }
        _ => false,
    }
}

/// True if `err` reports that `table` does not exist.
pub fn is_missing_table(err: &rusqlite::Error, table: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => {
            msg.contains("no such table") && msg.contains(table)
        }
        _ => false,
    }
}

/// Map "no rows" to the given not-found error.
pub fn not_found_as(err: rusqlite::Error, not_found: OnboardError) -> OnboardError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => not_found,
        other => OnboardError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_keys_are_enabled() {
        let db = Db::open_in_memory().unwrap();
        let on: bool = db
            .with_conn(|c| Ok(c.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?))
            .unwrap();
        assert!(on);
    }

    #[test]
    fn open_on_disk_creates_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".onboard/onboard.db");
        Db::open(&path).unwrap();
        assert!(path.exists());
        // Reopen applies nothing new and keeps working.
        Db::open(&path).unwrap();
    }

    #[test]
    fn tx_rolls_back_on_error() {
        let db = Db::open_in_memory().unwrap();
        let res: Result<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO clients (id, name, created_at, updated_at) VALUES (x'01', 'a', '', '')",
                [],
            )?;
            Err(OnboardError::InvalidInput("boom".into()))
        });
        assert!(res.is_err());
        let n: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM clients", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn classifies_missing_table() {
        let db = Db::open_in_memory().unwrap();
        let err = db
            .with_conn(|c| Ok(c.execute("DELETE FROM no_such_thing", [])?))
            .unwrap_err();
        match err {
            OnboardError::Database(e) => assert!(is_missing_table(&e, "no_such_thing")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
