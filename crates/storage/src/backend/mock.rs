//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Writes are
/// counted, which lets tests assert that something was (or wasn't) persisted.
///
/// # Examples
///
/// ```
/// use titledb_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("4541000D.png", b"\x89PNG"),
/// ]);
/// assert!(backend.exists(Path::new("4541000D.png")).await?);
///
/// backend.write(Path::new("4D530004.png"), b"data...").await?;
/// assert_eq!(backend.writes(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            writes: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of successful [`write()`](StorageBackend::write) calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let entries: Vec<(PathBuf, u64)> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(path, _)| path.components().count() == 1)
                    .map(|(path, data)| (path.clone(), data.len() as u64))
                    .collect()
            };
            for (path, size) in entries {
                yield Ok(FileInfo::new(path, size));
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let data = self.storage.read().await.get(&path).cloned();
        data.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.insert(path, data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        let mut guard = self.storage.write().await;
        let entry = guard.remove(&from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from)))?;
        guard.insert(to, entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_files_and_list() {
        let backend = MockBackend::with_files([
            ("4541000d.png", b"one".to_vec()),
            ("4d530004.png", b"two".to_vec()),
            ("nested/deeper.png", b"three".to_vec()),
        ]);
        let mut files = backend.list().await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(files, vec![FileInfo::new("4541000d.png", 3), FileInfo::new("4d530004.png", 3)]);
    }

    #[tokio::test]
    async fn test_write_counts() {
        let backend = MockBackend::default().with_name("test");
        assert_eq!(backend.name(), "test");
        backend.write(Path::new("a.png"), b"data").await.unwrap();
        backend.write(Path::new("a.png"), b"more").await.unwrap();
        assert_eq!(backend.writes(), 2);
        assert_eq!(backend.read(Path::new("a.png")).await.unwrap(), b"more");
    }

    #[tokio::test]
    async fn test_rename() {
        let backend = MockBackend::with_files([("old.png", b"data")]);
        backend.rename(Path::new("old.png"), Path::new("new.png")).await.unwrap();
        assert!(!backend.exists(Path::new("old.png")).await.unwrap());
        assert_eq!(backend.read(Path::new("new.png")).await.unwrap(), b"data");
        let err = backend.rename(Path::new("old.png"), Path::new("x.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_path() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("../escape.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
