//! Durable blob storage addressed by relative paths.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::services::errors::StorageError;

/// Blob storage used for downloaded product images.
///
/// Paths are relative to the storage root and use `/` as separator.
pub trait BlobStorage {
    fn exists(&self, path: &str) -> Result<bool, StorageError>;
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    /// Write `bytes` to `path`, creating missing directories.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
    /// Delete one blob. Deleting a missing blob is not an error.
    fn delete(&self, path: &str) -> Result<(), StorageError>;
    /// Delete a directory and everything below it.
    fn delete_dir(&self, path: &str) -> Result<(), StorageError>;
    /// Move a blob to `to`, creating missing directories.
    fn rename(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let bytes = self.read(from)?;
        self.write(to, &bytes)?;
        self.delete(from)
    }
}

/// [`BlobStorage`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_string(),
        source,
    }
}

impl BlobStorage for FsStorage {
    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.is_file())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        std::fs::read(self.resolve(path)?).map_err(io_error(path))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(path))?;
        }
        std::fs::write(&full, bytes).map_err(io_error(path))
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.resolve(path)?) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error(path)(e)),
            _ => Ok(()),
        }
    }

    fn delete_dir(&self, path: &str) -> Result<(), StorageError> {
        match std::fs::remove_dir_all(self.resolve(path)?) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error(path)(e)),
            _ => Ok(()),
        }
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(to))?;
        }
        std::fs::rename(source, target).map_err(io_error(from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_reads_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.write("products/acme/1/a.png", b"png").unwrap();
        assert!(storage.exists("products/acme/1/a.png").unwrap());
        assert_eq!(storage.read("products/acme/1/a.png").unwrap(), b"png");

        storage.delete("products/acme/1/a.png").unwrap();
        assert!(!storage.exists("products/acme/1/a.png").unwrap());
        storage.delete("products/acme/1/a.png").unwrap();
    }

    #[test]
    fn deletes_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.write("products/acme/2/a.jpg", b"1").unwrap();
        storage.write("products/acme/2/b.jpg", b"2").unwrap();
        storage.delete_dir("products/acme/2").unwrap();
        assert!(!storage.exists("products/acme/2/a.jpg").unwrap());
        storage.delete_dir("products/acme/2").unwrap();
    }

    #[test]
    fn renames_into_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.write("staging/acme/x/a.png", b"png").unwrap();
        storage
            .rename("staging/acme/x/a.png", "products/acme/3/a.png")
            .unwrap();
        assert!(!storage.exists("staging/acme/x/a.png").unwrap());
        assert_eq!(storage.read("products/acme/3/a.png").unwrap(), b"png");
        assert!(storage.rename("staging/acme/x/a.png", "products/acme/3/b.png").is_err());
        assert!(matches!(
            storage.rename("products/acme/3/a.png", "../a.png"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn rejects_paths_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        for path in ["../x.png", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(
                storage.write(path, b"x"),
                Err(StorageError::InvalidPath(_))
            ));
        }
    }
}
