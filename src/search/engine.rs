//! Search Service - combines embedder, vector index, annotator and the
//! document store
//!
//! Locking: searches share a read lock on the index; add, delete and
//! compaction take the write lock and write the index file before
//! releasing it. Embedding and text extraction happen before any lock is
//! taken.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::annotate::ResultAnnotator;
use super::context::ContextWindow;
use super::embedding::{self, Embedder};
use super::index::{EntryMetadata, VectorIndex};
use super::vectordb::{IndexFile, IndexStats};
use crate::core::config::Config;
use crate::core::document::{Document, DocumentStore, SqliteDocumentStore};
use crate::core::error::{RagError, Result};
use crate::core::extract::{clean_text, extract_text, DocumentKind};

/// One ranked, annotated match
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: f32,
    pub resume_id: i64,
    pub filename: String,
    pub citations: Vec<String>,
}

/// Result of a conversational search
#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub conversation: Vec<String>,
    pub latest_query: String,
    pub context: String,
    pub results: Vec<SearchHit>,
}

/// Result of an upload
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub id: i64,
    pub filename: String,
    pub chars: usize,
    pub cleaned_preview: String,
}

pub struct SearchService {
    embedder: Arc<dyn Embedder>,
    documents: Box<dyn DocumentStore>,
    index: RwLock<VectorIndex>,
    index_file: Option<Mutex<IndexFile>>,
    annotator: ResultAnnotator,
    preview_chars: usize,
}

impl SearchService {
    /// Assemble a service from explicit parts.
    ///
    /// Without an index file, ingests live in memory only.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        documents: Box<dyn DocumentStore>,
        index: VectorIndex,
        index_file: Option<IndexFile>,
        annotator: ResultAnnotator,
    ) -> Result<Self> {
        if embedder.dimensions() != index.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: index.dimension(),
                actual: embedder.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            documents,
            index: RwLock::new(index),
            index_file: index_file.map(Mutex::new),
            annotator,
            preview_chars: 800,
        })
    }

    /// Open the on-disk document store and index under `config.data_dir`.
    pub fn open(config: &Config) -> Result<Self> {
        let paths = config.paths();
        paths.ensure_root()?;

        let embedder = embedding::from_config(config)?;
        let index = VectorIndex::load(&paths.index, config.dimension)?;
        info!(
            path = %paths.index.display(),
            entries = index.len(),
            live = index.live_len(),
            embedder = embedder.name(),
            "Loaded vector index"
        );

        let index_file = IndexFile::open(&paths.index)?;
        let documents = SqliteDocumentStore::open(&paths.documents)?;

        let mut service = Self::new(
            embedder,
            Box::new(documents),
            index,
            Some(index_file),
            ResultAnnotator::new(config.max_snippets, config.fallback_chars),
        )?;
        service.preview_chars = config.preview_chars;
        Ok(service)
    }

    /// In-memory service (for testing)
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dimension = embedder.dimensions();
        Self::new(
            embedder,
            Box::new(SqliteDocumentStore::open_in_memory()?),
            VectorIndex::new(dimension),
            Some(IndexFile::open_in_memory()?),
            ResultAnnotator::default(),
        )
    }

    /// Stateless semantic search
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::required("Query"));
        }
        self.search_unchecked(query, k)
    }

    /// Match resumes against a job description
    pub fn match_text(&self, jd_text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let jd_text = jd_text.trim();
        if jd_text.is_empty() {
            return Err(RagError::required("Job description text is"));
        }
        self.search_unchecked(jd_text, k)
    }

    /// Search with the window's recent queries folded into `query`.
    ///
    /// Citations are extracted against the effective context string.
    pub fn conversational_search(
        &self,
        window: &mut ContextWindow,
        query: &str,
        k: usize,
    ) -> Result<ConversationResponse> {
        window.append(query)?;
        let context = window.effective_query();
        let results = self.search_unchecked(&context, k)?;

        Ok(ConversationResponse {
            conversation: window.history(),
            latest_query: window.latest().unwrap_or_default().to_string(),
            context,
            results,
        })
    }

    fn search_unchecked(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let query_embedding = self.embedder.embed(query)?;

        let index = self.index.read();
        let neighbors = index.search(&query_embedding, k)?;
        debug!(query, k, hits = neighbors.len(), "Search");

        let hits = neighbors
            .into_iter()
            .filter_map(|n| index.entry(n.ordinal).map(|e| (n.distance, &e.metadata)))
            .enumerate()
            .map(|(pos, (distance, meta))| SearchHit {
                rank: pos + 1,
                score: distance,
                resume_id: meta.document_id,
                filename: meta.display_name.clone(),
                citations: self.annotator.extract(&meta.text, query),
            })
            .collect();

        Ok(hits)
    }

    /// Extract, clean and index an uploaded file.
    pub fn ingest_file(&self, filename: &str, bytes: &[u8]) -> Result<IngestSummary> {
        let kind = DocumentKind::from_filename(filename)?;
        let raw_text = extract_text(bytes, kind)?;
        if raw_text.trim().is_empty() {
            return Err(RagError::NoTextExtracted(filename.to_string()));
        }

        self.ingest_text(filename, &clean_text(&raw_text))
    }

    /// Store and index already-extracted text.
    ///
    /// On success the entry is in the index file; on failure neither the
    /// document nor the index entry is left behind.
    pub fn ingest_text(&self, filename: &str, text: &str) -> Result<IngestSummary> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Err(RagError::NoTextExtracted(filename.to_string()));
        }

        let embedding = self.embedder.embed(&cleaned)?;
        let id = self.documents.insert(filename, &cleaned)?;

        let metadata = EntryMetadata {
            document_id: id,
            display_name: filename.to_string(),
            text: cleaned.clone(),
        };

        if let Err(e) = self.add_to_index(embedding, metadata) {
            warn!(id, filename, error = %e, "Indexing failed, removing document");
            if let Err(cleanup) = self.documents.delete(id) {
                warn!(id, error = %cleanup, "Failed to remove orphaned document");
            }
            return Err(e);
        }

        info!(id, filename, chars = cleaned.chars().count(), "Ingested resume");

        Ok(IngestSummary {
            id,
            filename: filename.to_string(),
            chars: cleaned.chars().count(),
            cleaned_preview: cleaned.chars().take(self.preview_chars).collect(),
        })
    }

    fn add_to_index(&self, embedding: Vec<f32>, metadata: EntryMetadata) -> Result<()> {
        let mut index = self.index.write();
        let before = index.len();
        let ordinal = index.add(embedding, metadata)?;

        if let Some(file) = &self.index_file {
            let entry = index.entry(ordinal).cloned();
            let persisted = match entry {
                Some(entry) => file.lock().append(&entry, index.dimension()),
                None => Err(RagError::Persistence(format!("ordinal {} vanished", ordinal))),
            };
            if let Err(e) = persisted {
                index.truncate(before);
                return Err(e);
            }
        }

        Ok(())
    }

    pub fn get_document(&self, id: i64) -> Result<Document> {
        self.documents.get(id)?.ok_or(RagError::NotFound(id))
    }

    /// Delete a resume and tombstone its index entries.
    /// Returns the number of documents removed (0 for an unknown id).
    ///
    /// The index file is tombstoned first; if that fails nothing changes.
    pub fn delete_document(&self, id: i64) -> Result<usize> {
        let mut index = self.index.write();
        if let Some(file) = &self.index_file {
            file.lock().mark_deleted(id)?;
        }
        let tombstoned = index.tombstone(id);

        let affected = match self.documents.delete(id) {
            Ok(affected) => affected,
            Err(e) => {
                // Entry stays hidden; the orphaned row is unreachable through search.
                warn!(id, error = %e, "Index entry tombstoned but document removal failed");
                return Err(e);
            }
        };

        info!(id, affected, tombstoned, "Deleted resume");
        Ok(affected)
    }

    /// Rebuild the index without tombstoned entries and persist it.
    /// Returns the number of entries dropped.
    pub fn compact(&self) -> Result<usize> {
        let mut index = self.index.write();
        let compacted = index.compact();
        let dropped = index.len() - compacted.len();

        if let Some(file) = &self.index_file {
            file.lock().save_snapshot(&compacted)?;
        }
        *index = compacted;

        info!(dropped, remaining = index.len(), "Compacted vector index");
        Ok(dropped)
    }

    /// Write a full snapshot of the current index.
    pub fn flush(&self) -> Result<()> {
        let index = self.index.write();
        if let Some(file) = &self.index_file {
            file.lock().save_snapshot(&index)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let index = self.index.read();
        Ok(IndexStats {
            entry_count: index.len(),
            live_count: index.live_len(),
            dimension: Some(index.dimension()),
            last_added: index.entries().last().map(|e| e.added_at),
        })
    }

    pub fn document_count(&self) -> Result<usize> {
        self.documents.count()
    }

    pub fn embedder_name(&self) -> &'static str {
        self.embedder.name()
    }
}
