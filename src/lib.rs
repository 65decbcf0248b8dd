//! resume-rag library
//!
//! Resume indexing and explainable similarity search.
//!
//! # Modules
//!
//! - `core`: Configuration, errors, document store and text extraction
//! - `search`: Embedders, vector index, citations, conversational context

pub mod core;
pub mod search;

// Re-exports for convenience
pub use self::core::config::{Config, EmbedderKind};
pub use self::core::document::{Document, DocumentStore, SqliteDocumentStore};
pub use self::core::error::{ErrorKind, RagError, Result};
pub use self::core::paths::DataPaths;
pub use search::{
    ContextWindow, ConversationResponse, IngestSummary, SearchHit, SearchService,
    SessionRegistry,
};
