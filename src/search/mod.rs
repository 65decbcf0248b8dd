//! Resume search engine
//!
//! Embedding, exact vector search, citation extraction and conversational
//! context, composed by `SearchService`.

pub mod annotate;
pub mod context;
pub mod embedding;
pub mod engine;
pub mod index;
pub mod vectordb;

pub use annotate::ResultAnnotator;
pub use context::{ContextWindow, SessionRegistry};
pub use embedding::{Embedder, HtpEmbedder, SeededEmbedder};
pub use engine::{ConversationResponse, IngestSummary, SearchHit, SearchService};
pub use index::{EntryMetadata, IndexEntry, Neighbor, VectorIndex};
pub use vectordb::{IndexFile, IndexStats};
