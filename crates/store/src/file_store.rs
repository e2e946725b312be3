//! File access collaborator
//!
//! Pages with a PDF background reference their source file by name; the
//! exporter fetches the bytes through this trait so the surrounding
//! application stays in control of where imported files actually live.

use crate::{Result, StoreError};
use std::path::PathBuf;

/// Read access to imported source files, keyed by file name
pub trait FileStore {
    /// Fetch the bytes of a named file. Returns
    /// [`StoreError::FileNotFound`] when the name cannot be resolved, so
    /// callers can offer a relocate/remove recovery flow.
    fn read(&self, file_name: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// File store backed by a single directory
#[derive(Debug, Clone)]
pub struct DirFileStore {
    root: PathBuf,
}

impl DirFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileStore for DirFileStore {
    async fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Err(StoreError::FileNotFound(file_name.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }
}

/// In-memory file store, used by tests and unsaved imports
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: std::collections::HashMap<String, Vec<u8>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, data: Vec<u8>) {
        self.files.insert(file_name.into(), data);
    }
}

impl FileStore for MemoryFileStore {
    async fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| StoreError::FileNotFound(file_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let mut store = MemoryFileStore::new();
        store.insert("notes.pdf", vec![1, 2, 3]);

        assert_eq!(store.read("notes.pdf").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            store.read("gone.pdf").await,
            Err(StoreError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dir_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirFileStore::new(dir.path());
        assert!(matches!(
            store.read("missing.pdf").await,
            Err(StoreError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dir_store_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF-1.4").unwrap();

        let store = DirFileStore::new(dir.path());
        assert_eq!(store.read("a.pdf").await.unwrap(), b"%PDF-1.4");
    }
}
