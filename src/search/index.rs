//! Exact nearest-neighbor index over L2 distance
//!
//! Vectors and their metadata live in a single entry per ordinal, so the two
//! can never drift apart. Deletion only tombstones an entry; `compact`
//! rebuilds the index without them.
//!
//! - Add: O(1) amortized
//! - Search: O(n * d) linear scan

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use super::embedding::l2_distance;
use super::vectordb::IndexFile;
use crate::core::error::{RagError, Result};

/// Denormalized document metadata kept next to each vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryMetadata {
    pub document_id: i64,
    pub display_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub ordinal: usize,
    pub metadata: EntryMetadata,
    pub vector: Vec<f32>,
    pub added_at: DateTime<Utc>,
    pub deleted: bool,
}

/// A raw nearest-neighbor hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    pub(crate) fn from_entries(dimension: usize, entries: Vec<IndexEntry>) -> Self {
        Self { dimension, entries }
    }

    /// Load a persisted index.
    ///
    /// A missing file yields an empty index. A file that exists but cannot
    /// be read back completely is an error, never an empty index.
    pub fn load(path: &Path, dimension: usize) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(dimension));
        }
        IndexFile::open_existing(path)?.load(dimension)
    }

    /// Write a full snapshot to `path`, replacing its previous contents.
    pub fn persist(&self, path: &Path) -> Result<()> {
        IndexFile::open(path)?.save_snapshot(self)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of entries, tombstones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that are not tombstoned
    pub fn live_len(&self) -> usize {
        self.entries.iter().filter(|e| !e.deleted).count()
    }

    pub fn entry(&self, ordinal: usize) -> Option<&IndexEntry> {
        self.entries.get(ordinal)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append a vector with its metadata, returning the new ordinal.
    pub fn add(&mut self, vector: Vec<f32>, metadata: EntryMetadata) -> Result<usize> {
        self.validate_vector(&vector)?;

        let ordinal = self.entries.len();
        self.entries.push(IndexEntry {
            ordinal,
            metadata,
            vector,
            added_at: Utc::now(),
            deleted: false,
        });
        Ok(ordinal)
    }

    /// Drop entries at and beyond `len`. Used to undo an add whose
    /// persistence failed.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Up to `k` nearest live entries by ascending distance.
    /// Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.validate_vector(query)?;

        if k == 0 || self.entries.is_empty() {
            return Ok(vec![]);
        }

        let mut results: Vec<Neighbor> = self
            .entries
            .iter()
            .filter(|e| !e.deleted)
            .map(|e| Neighbor {
                ordinal: e.ordinal,
                distance: l2_distance(query, &e.vector),
            })
            .collect();

        // Stable sort over an ordinal-ordered scan
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(k);

        Ok(results)
    }

    /// Tombstone every live entry of a document, returning how many changed.
    pub fn tombstone(&mut self, document_id: i64) -> usize {
        let mut marked = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| !e.deleted && e.metadata.document_id == document_id)
        {
            entry.deleted = true;
            marked += 1;
        }
        marked
    }

    /// Rebuild without tombstones. Ordinals are reassigned in order.
    pub fn compact(&self) -> VectorIndex {
        let entries = self
            .entries
            .iter()
            .filter(|e| !e.deleted)
            .enumerate()
            .map(|(ordinal, e)| IndexEntry {
                ordinal,
                ..e.clone()
            })
            .collect();

        Self::from_entries(self.dimension, entries)
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        if let Some((i, v)) = vector.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(RagError::InvalidVector(format!(
                "non-finite value {} at index {}",
                v, i
            )));
        }

        Ok(())
    }
}
