//! Resume document store
//!
//! Persists the cleaned resume text and upload metadata. The search index
//! only keeps a denormalized copy of what it needs for citations, so this
//! store is consulted for point lookups and deletes.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

use super::error::Result;

/// A stored resume
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Access contract the search service needs from a document store.
pub trait DocumentStore: Send + Sync {
    /// Store a document and return its new id.
    fn insert(&self, filename: &str, content: &str) -> Result<i64>;

    fn get(&self, id: i64) -> Result<Option<Document>>;

    /// Delete a document, returning the number of rows removed.
    fn delete(&self, id: i64) -> Result<usize>;

    fn count(&self) -> Result<usize>;
}

/// SQLite-backed document store
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS resumes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                content TEXT NOT NULL,
                uploaded_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn insert(&self, filename: &str, content: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO resumes (filename, content, uploaded_at) VALUES (?1, ?2, ?3)",
            params![filename, content, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let document = conn
            .query_row(
                "SELECT id, filename, content, uploaded_at FROM resumes WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Document {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        content: row.get(2)?,
                        uploaded_at: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(document)
    }

    fn delete(&self, id: i64) -> Result<usize> {
        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM resumes WHERE id = ?1", params![id])?;
        Ok(affected)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM resumes", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_delete() -> Result<()> {
        let store = SqliteDocumentStore::open_in_memory()?;

        let id = store.insert("jane.pdf", "Rust engineer. Likes databases.")?;
        let doc = store.get(id)?.expect("document should exist");
        assert_eq!(doc.filename, "jane.pdf");
        assert_eq!(doc.content, "Rust engineer. Likes databases.");
        assert_eq!(store.count()?, 1);

        assert_eq!(store.delete(id)?, 1);
        assert!(store.get(id)?.is_none());
        assert_eq!(store.delete(id)?, 0);
        assert_eq!(store.count()?, 0);

        Ok(())
    }

    #[test]
    fn test_ids_are_not_reused() -> Result<()> {
        let store = SqliteDocumentStore::open_in_memory()?;

        let first = store.insert("a.pdf", "a")?;
        store.delete(first)?;
        let second = store.insert("b.pdf", "b")?;
        assert!(second > first);

        Ok(())
    }
}
