//! Index file using SQLite
//!
//! One row per index entry: ordinal, denormalized metadata and the embedding
//! as a little-endian f32 BLOB. Keeping vector and metadata in the same row
//! makes every append atomic.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

use super::index::{EntryMetadata, IndexEntry, VectorIndex};
use crate::core::error::{RagError, Result};

const FORMAT_VERSION: &str = "1";

pub struct IndexFile {
    conn: Connection,
}

impl IndexFile {
    /// Open or create the index file at path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let file = Self { conn };
        file.init_schema()?;
        Ok(file)
    }

    /// Open a file that must already hold an index. Never creates anything.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .map_err(|e| persistence(path, e))?;
        let file = Self { conn };

        let tables: i64 = file
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('entries', 'index_meta')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| persistence(path, e))?;
        if tables != 2 {
            return Err(RagError::Persistence(format!(
                "{} is not a complete index file",
                path.display()
            )));
        }

        Ok(file)
    }

    /// Open in-memory index file (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let file = Self { conn };
        file.init_schema()?;
        Ok(file)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                ordinal INTEGER PRIMARY KEY,
                document_id INTEGER NOT NULL,
                display_name TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                added_at TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_document ON entries(document_id);
            "#,
        )?;

        Ok(())
    }

    /// Record the dimension on first use, or check it matches.
    fn ensure_dimension(conn: &Connection, dimension: usize) -> Result<()> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'dimension'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(value) if value != dimension.to_string() => Err(RagError::Persistence(format!(
                "index file has dimension {}, configured {}",
                value, dimension
            ))),
            Some(_) => Ok(()),
            None => {
                conn.execute(
                    "INSERT INTO index_meta (key, value) VALUES ('dimension', ?1), ('format_version', ?2)",
                    params![dimension.to_string(), FORMAT_VERSION],
                )?;
                Ok(())
            }
        }
    }

    /// Append one entry in a single transaction.
    pub fn append(&mut self, entry: &IndexEntry, dimension: usize) -> Result<()> {
        let tx = self.conn.transaction()?;
        Self::ensure_dimension(&tx, dimension)?;
        insert_entry(&tx, entry)?;
        tx.commit()?;
        Ok(())
    }

    /// Tombstone all rows of a document, returning the number changed.
    pub fn mark_deleted(&self, document_id: i64) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE entries SET deleted = 1 WHERE document_id = ?1 AND deleted = 0",
            params![document_id],
        )?;
        Ok(changed)
    }

    /// Replace the whole file contents with `index`.
    pub fn save_snapshot(&mut self, index: &VectorIndex) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        tx.execute("DELETE FROM index_meta", [])?;
        Self::ensure_dimension(&tx, index.dimension())?;
        for entry in index.entries() {
            insert_entry(&tx, entry)?;
        }
        tx.execute(
            "INSERT INTO index_meta (key, value) VALUES ('last_snapshot', ?1)",
            params![Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Read the full index back.
    ///
    /// Fails on a dimension mismatch, gaps in the ordinals or
    /// wrong-sized embedding blobs.
    pub fn load(&self, dimension: usize) -> Result<VectorIndex> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'dimension'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(value) = stored {
            if value != dimension.to_string() {
                return Err(RagError::Persistence(format!(
                    "index file has dimension {}, configured {}",
                    value, dimension
                )));
            }
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT ordinal, document_id, display_name, content, embedding, added_at, deleted
            FROM entries
            ORDER BY ordinal
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                EntryMetadata {
                    document_id: row.get(1)?,
                    display_name: row.get(2)?,
                    text: row.get(3)?,
                },
                row.get::<_, Vec<u8>>(4)?,
                row.get::<_, DateTime<Utc>>(5)?,
                row.get::<_, bool>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row_result in rows {
            let (ordinal, metadata, blob, added_at, deleted) = row_result?;

            if ordinal != entries.len() as i64 {
                return Err(RagError::Persistence(format!(
                    "expected ordinal {}, found {}",
                    entries.len(),
                    ordinal
                )));
            }

            let vector = blob_to_embedding(&blob).ok_or_else(|| {
                RagError::Persistence(format!("malformed embedding at ordinal {}", ordinal))
            })?;
            if vector.len() != dimension {
                return Err(RagError::Persistence(format!(
                    "embedding at ordinal {} has {} components, expected {}",
                    ordinal,
                    vector.len(),
                    dimension
                )));
            }

            entries.push(IndexEntry {
                ordinal: entries.len(),
                metadata,
                vector,
                added_at,
                deleted,
            });
        }

        Ok(VectorIndex::from_entries(dimension, entries))
    }
}

/// Index statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexStats {
    pub entry_count: usize,
    pub live_count: usize,
    pub dimension: Option<usize>,
    pub last_added: Option<DateTime<Utc>>,
}

fn insert_entry(conn: &Connection, entry: &IndexEntry) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO entries (ordinal, document_id, display_name, content, embedding, added_at, deleted)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            entry.ordinal as i64,
            entry.metadata.document_id,
            entry.metadata.display_name,
            entry.metadata.text,
            embedding_to_blob(&entry.vector),
            entry.added_at,
            entry.deleted,
        ],
    )?;
    Ok(())
}

fn persistence(path: &Path, e: rusqlite::Error) -> RagError {
    RagError::Persistence(format!("cannot read {}: {}", path.display(), e))
}

/// Convert f32 embedding to BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

/// Convert BLOB to f32 embedding; `None` if the length is not a multiple of 4
fn blob_to_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new(4);
        for id in 1..=3 {
            index
                .add(
                    vec![id as f32, 0.5, -0.25, 1.0 / id as f32],
                    EntryMetadata {
                        document_id: id,
                        display_name: format!("cv-{}.docx", id),
                        text: format!("Resume number {}.", id),
                    },
                )
                .unwrap();
        }
        index
    }

    #[test]
    fn test_blob_conversion() {
        let embedding = vec![1.0, 2.0, 3.0, -0.5];
        let blob = embedding_to_blob(&embedding);
        assert_eq!(blob_to_embedding(&blob), Some(embedding));
        assert_eq!(blob_to_embedding(&blob[..5]), None);
    }

    #[test]
    fn test_snapshot_and_load() -> Result<()> {
        let mut index = sample_index();
        index.tombstone(2);

        let mut file = IndexFile::open_in_memory()?;
        file.save_snapshot(&index)?;

        let loaded = file.load(4)?;
        assert_eq!(loaded, index);

        assert_eq!(loaded.live_len(), 2);

        Ok(())
    }

    #[test]
    fn test_append_and_mark_deleted() -> Result<()> {
        let index = sample_index();
        let mut file = IndexFile::open_in_memory()?;
        for entry in index.entries() {
            file.append(entry, 4)?;
        }

        assert_eq!(file.mark_deleted(3)?, 1);
        assert_eq!(file.mark_deleted(3)?, 0);

        let loaded = file.load(4)?;
        assert_eq!(loaded.len(), 3);
        assert!(loaded.entry(2).unwrap().deleted);
        assert_eq!(loaded.entry(0).unwrap().vector, index.entry(0).unwrap().vector);

        Ok(())
    }

    #[test]
    fn test_dimension_mismatch_fails_load() -> Result<()> {
        let mut file = IndexFile::open_in_memory()?;
        file.save_snapshot(&sample_index())?;

        let err = file.load(8).unwrap_err();
        assert!(matches!(err, RagError::Persistence(_)));

        let entry = sample_index().entries()[0].clone();
        assert!(file.append(&entry, 8).is_err());

        Ok(())
    }

    #[test]
    fn test_ordinal_gap_fails_load() -> Result<()> {
        let mut file = IndexFile::open_in_memory()?;
        file.save_snapshot(&sample_index())?;
        file.conn.execute("DELETE FROM entries WHERE ordinal = 1", [])?;

        assert!(matches!(file.load(4), Err(RagError::Persistence(_))));
        Ok(())
    }

    #[test]
    fn test_truncated_blob_fails_load() -> Result<()> {
        let mut file = IndexFile::open_in_memory()?;
        file.save_snapshot(&sample_index())?;
        file.conn.execute(
            "UPDATE entries SET embedding = x'00000000' WHERE ordinal = 0",
            [],
        )?;

        assert!(matches!(file.load(4), Err(RagError::Persistence(_))));
        Ok(())
    }
}
