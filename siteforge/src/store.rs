//! Durable storage for merged aggregate documents.
//!
//! The core never persists on its own; a caller invokes its store only
//! when a request carries the persist flag. Writes go through a temp
//! file and an atomic rename so a concurrent reader never observes a
//! torn document.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::StoreError;
use crate::merge::AggregateDocument;

/// Saves and loads aggregate documents by name.
pub trait DocumentStore: Send + Sync {
    /// Persists a document under a name, returning the written path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on filesystem failure.
    fn save(&self, name: &str, document: &AggregateDocument) -> Result<PathBuf, StoreError>;

    /// Loads a previously saved document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file cannot be read and
    /// [`StoreError::Corrupt`] when it does not parse.
    fn load(&self, name: &str) -> Result<AggregateDocument, StoreError>;
}

/// A filesystem-backed store writing pretty-printed JSON files under a
/// root directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Creates a store rooted at `root`. The directory is created on
    /// first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The path a named document is stored at.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn io_err(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl DocumentStore for FsDocumentStore {
    fn save(&self, name: &str, document: &AggregateDocument) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| Self::io_err(&self.root, e))?;

        let path = self.path_for(name);
        let content = serde_json::to_string_pretty(document).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;

        // Write to temp file, then rename for atomicity.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).map_err(|e| Self::io_err(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| Self::io_err(&path, e))?;

        tracing::debug!(path = %path.display(), "aggregate document persisted");
        Ok(path)
    }

    fn load(&self, name: &str) -> Result<AggregateDocument, StoreError> {
        let path = self.path_for(name);
        let content = fs::read_to_string(&path).map_err(|e| Self::io_err(&path, e))?;
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path,
            message: e.to_string(),
        })
    }
}
