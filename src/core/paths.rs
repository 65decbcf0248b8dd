use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = ".resume-rag";

pub struct DataPaths {
    pub root: PathBuf,
    pub documents: PathBuf,
    pub index: PathBuf,
}

impl DataPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            documents: root.join("resumes.db"),
            index: root.join("index.db"),
            root,
        }
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = DataPaths::from_root(PathBuf::from("/srv/rag"));
        assert_eq!(paths.documents, PathBuf::from("/srv/rag/resumes.db"));
        assert_eq!(paths.index, PathBuf::from("/srv/rag/index.db"));
    }
}
