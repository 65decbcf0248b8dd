//! Error taxonomy shared by the index, the document store and the service.

use thiserror::Error;

/// Broad error category, used by the CLI and the MCP layer to pick a
/// response without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Extraction,
    Persistence,
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported file type: {0} (only .pdf and .docx files are supported)")]
    UnsupportedFileType(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Resume not found: {0}")]
    NotFound(i64),

    #[error("No text extracted from {0}. Possibly a scanned/image PDF")]
    NoTextExtracted(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Index persistence failed: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::Validation(_)
            | RagError::UnsupportedFileType(_)
            | RagError::DimensionMismatch { .. }
            | RagError::InvalidVector(_) => ErrorKind::Validation,
            RagError::NotFound(_) => ErrorKind::NotFound,
            RagError::NoTextExtracted(_) | RagError::Extraction(_) => ErrorKind::Extraction,
            RagError::Persistence(_) | RagError::Database(_) | RagError::Io(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// Shorthand for the "empty input" validation failures.
    pub fn required(what: &str) -> Self {
        RagError::Validation(format!("{} required.", what))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
