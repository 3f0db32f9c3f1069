use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::errors::CyberHuntError;

/// Shared handle to the SQLite store. Cloning shares the same connection.
pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, CyberHuntError> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| CyberHuntError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| CyberHuntError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, CyberHuntError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CyberHuntError::Database(format!("Failed to open in-memory db: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| CyberHuntError::Database(format!("Failed to set pragmas: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), CyberHuntError> {
        let conn = self.lock()?;
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| CyberHuntError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, CyberHuntError> {
        self.conn
            .lock()
            .map_err(|_| CyberHuntError::Database("Connection mutex poisoned".into()))
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction. The transaction is
    /// committed only if `f` succeeds; any error rolls every write back.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, CyberHuntError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, CyberHuntError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| CyberHuntError::Database(format!("Failed to begin transaction: {}", e)))?;
        let value = f(&tx)?;
        tx.commit()
            .map_err(|e| CyberHuntError::Database(format!("Failed to commit: {}", e)))?;
        Ok(value)
    }

    /// Run a read-only closure against the connection.
    pub fn read<T, F>(&self, f: F) -> Result<T, CyberHuntError>
    where
        F: FnOnce(&Connection) -> Result<T, CyberHuntError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::in_memory().unwrap();
        let result: Result<(), CyberHuntError> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO reviewers (id, user_id, username, max_assignments, created_at) VALUES ('rev-1', 'u-1', 'alice', 2, '2026-01-01T00:00:00.000000Z')",
                [],
            )?;
            Err(CyberHuntError::Validation("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM reviewers", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_new_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cyberhunt.db");
        let _db = Database::new(path.to_str().unwrap()).unwrap();
        assert!(path.exists());
    }
}
