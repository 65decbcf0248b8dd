//! Runtime configuration
//!
//! Loaded from YAML (`resume-rag.yaml` in the working directory, or an
//! explicit `--config` path). Every field has a default, so a partial file
//! or no file at all is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{RagError, Result};
use super::paths::{DataPaths, DEFAULT_DATA_DIR};

pub const CONFIG_FILE_NAME: &str = "resume-rag.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Harmonic token projection
    Htp,
    /// Text-seeded pseudorandom vectors
    Seeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub dimension: usize,
    pub embedder: EmbedderKind,
    pub top_k: usize,
    pub max_snippets: usize,
    pub fallback_chars: usize,
    pub context_turns: usize,
    pub max_history: usize,
    pub preview_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            dimension: 384,
            embedder: EmbedderKind::Htp,
            top_k: 5,
            max_snippets: 2,
            fallback_chars: 200,
            context_turns: 3,
            max_history: 50,
            preview_chars: 800,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `resume-rag.yaml` in the
    /// current directory is used when present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = PathBuf::from(CONFIG_FILE_NAME);
                if local.exists() {
                    Self::from_file(&local)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| RagError::Validation(format!("Invalid configuration: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(RagError::Validation("dimension must be positive".into()));
        }
        if self.embedder == EmbedderKind::Htp && self.dimension % 2 != 0 {
            return Err(RagError::Validation(format!(
                "htp embedder needs an even dimension, got {}",
                self.dimension
            )));
        }
        if self.context_turns == 0 || self.max_history == 0 {
            return Err(RagError::Validation(
                "context_turns and max_history must be positive".into(),
            ));
        }
        if self.context_turns > self.max_history {
            return Err(RagError::Validation(
                "context_turns cannot exceed max_history".into(),
            ));
        }
        Ok(())
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::from_root(self.data_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("top_k: 3\nembedder: seeded\n").unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.embedder, EmbedderKind::Seeded);
        assert_eq!(config.dimension, 384);
        assert_eq!(config.context_turns, 3);
        assert_eq!(config.max_history, 50);
    }

    #[test]
    fn test_rejects_odd_htp_dimension() {
        let config = Config {
            dimension: 385,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let seeded = Config {
            dimension: 385,
            embedder: EmbedderKind::Seeded,
            ..Config::default()
        };
        assert!(seeded.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_embedder() {
        assert!(Config::from_yaml("embedder: bert\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = Config::load(Some(Path::new("/nonexistent/resume-rag.yaml")));
        assert!(result.is_err());
    }
}
