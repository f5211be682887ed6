//! Local filesystem storage backend.
//!
//! Files are stored in a configured directory and accessed via `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use titledb_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("icons", "/games/data/icons")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or exists but isn't a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }

        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Metadata of one directory entry; `None` for anything but a regular
    /// file.
    async fn file_info(entry: DirEntry) -> Result<Option<FileInfo>> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        if !metadata.is_file() {
            return Ok(None);
        }
        let name = PathBuf::from(entry.file_name());
        Ok(Some(FileInfo::new(validate_path(&name)?, metadata.len())))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                // A root that doesn't exist (yet) is empty.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                    return;
                },
            };
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => match Self::file_info(entry).await {
                        Ok(Some(info)) => yield Ok(info),
                        Ok(None) => {},
                        Err(e) => yield Err(e),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(exn::Exn::from(Self::map_io_error(e, &self.root)));
                        break;
                    },
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, to))?;
        }
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, from))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("icons", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("icons", "relative/path").is_err());
        assert!(LocalBackend::new("icons", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("data/icons");
        let backend = LocalBackend::new("icons", &root).unwrap();
        assert!(root.is_dir());
        assert_eq!(backend.root(), root);
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("id_database.json");
        std::fs::write(&file, b"{}").unwrap();
        let err = LocalBackend::new("icons", &file).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("icons", temp_dir.path()).unwrap();
        let abs = temp_dir.path().join("4541000D.png");
        assert_eq!(backend.absolute_path(Path::new("4541000D.png")).unwrap(), abs);
        assert!(backend.absolute_path(Path::new("../id_database.json")).is_err());
    }

    #[tokio::test]
    async fn test_write_read_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("icons", temp_dir.path()).unwrap();
        assert!(!backend.exists(Path::new("4541000D.png")).await.unwrap());
        backend.write(Path::new("4541000D.png"), b"png bytes").await.unwrap();
        assert!(backend.exists(Path::new("4541000D.png")).await.unwrap());
        assert_eq!(backend.read(Path::new("4541000D.png")).await.unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn test_read_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("icons", temp_dir.path()).unwrap();
        let err = backend.read(Path::new("missing.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("icons", temp_dir.path()).unwrap();
        backend.write(Path::new("4541000D.png"), b"data").await.unwrap();
        backend.rename(Path::new("4541000D.png"), Path::new("4541000E.png")).await.unwrap();
        assert!(!backend.exists(Path::new("4541000D.png")).await.unwrap());
        assert_eq!(backend.read(Path::new("4541000E.png")).await.unwrap(), b"data");
        let err = backend.rename(Path::new("4541000D.png"), Path::new("x.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_is_flat() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("icons", temp_dir.path()).unwrap();
        assert!(backend.list().await.unwrap().is_empty());
        backend.write(Path::new("4541000d.png"), b"12345").await.unwrap();
        backend.write(Path::new("4d530004.png"), b"data").await.unwrap();
        backend.write(Path::new("nested/deeper.png"), b"data").await.unwrap();
        let mut files = backend.list().await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(files, vec![FileInfo::new("4541000d.png", 5), FileInfo::new("4d530004.png", 4)]);
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("icons");
        let backend = LocalBackend::new("icons", &root).unwrap();
        std::fs::remove_dir(&root).unwrap();
        assert!(backend.list().await.unwrap().is_empty());
    }
}
