//! Hierarchical filesystem backend on `tokio::fs`.
//!
//! Paths are interpreted as ordinary filesystem paths. Open-with-create
//! materializes missing parent directories and an empty file, which is what
//! lets a first `load` observe blank content instead of an error.
//!
//! `std::io::ErrorKind::NotFound` and `PermissionDenied` map to the matching
//! contract variants; every other kind passes through opaquely.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use confstore_core::{StorageBackend, StorageError, StorageStream};

/// The filesystem backend. Stateless; all state lives in the files.
#[derive(Debug, Clone, Default)]
pub struct FileSystemBackend;

impl FileSystemBackend {
    pub fn new() -> Self {
        Self
    }
}

fn map_io_error(path: &str, error: io::Error) -> StorageError {
    match error.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.to_string()),
        _ => StorageError::Io {
            path: path.to_string(),
            source: error,
        },
    }
}

async fn create_parent_dirs(target: &Path, raw: &str) -> Result<(), StorageError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|error| map_io_error(raw, error))?;
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for FileSystemBackend {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|error| map_io_error(path, error))
    }

    async fn open_read(
        &self,
        path: &str,
        create_if_missing: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        let target = PathBuf::from(path);
        let opened = if create_if_missing {
            create_parent_dirs(&target, path).await?;
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&target)
                .await
        } else {
            OpenOptions::new().read(true).open(&target).await
        };

        let file = opened.map_err(|error| map_io_error(path, error))?;
        Ok(Box::new(FileStream::new(path, file)))
    }

    async fn open_overwrite(
        &self,
        path: &str,
        create_intermediate: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        let target = PathBuf::from(path);
        if create_intermediate {
            create_parent_dirs(&target, path).await?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target)
            .await
            .map_err(|error| map_io_error(path, error))?;
        Ok(Box::new(FileStream::new(path, file)))
    }
}

/// Stream over one open file. The handle is dropped on close; later calls
/// fail with [`StorageError::Closed`].
struct FileStream {
    path: String,
    file: Option<File>,
}

impl FileStream {
    fn new(path: &str, file: File) -> Self {
        Self {
            path: path.to_string(),
            file: Some(file),
        }
    }
}

#[async_trait]
impl StorageStream for FileStream {
    async fn read_all(&mut self) -> Result<Vec<u8>, StorageError> {
        let file = self.file.as_mut().ok_or(StorageError::Closed)?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .await
            .map_err(|error| map_io_error(&self.path, error))?;
        Ok(content)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let file = self.file.as_mut().ok_or(StorageError::Closed)?;
        file.write_all(data)
            .await
            .map_err(|error| map_io_error(&self.path, error))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|error| map_io_error(&self.path, error))?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
