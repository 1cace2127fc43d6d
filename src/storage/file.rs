//! File storage module
//!
//! Handles file I/O for a downloaded pack: directory creation, resume
//! length, truncating fresh downloads and appending resumed ones.

use anyhow::Result;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, trace};

use crate::error::XdccError;
use crate::storage::backend::{StorageBackend, StorageMetadata, StorageType};

/// Local file a pack is written into
#[derive(Debug)]
pub struct FileStorage {
    /// Full path of the target file
    path: PathBuf,
    /// Open handle while a transfer is running
    file: Option<fs::File>,
    /// Length of the file as far as this handle knows
    stored_len: u64,
}

impl FileStorage {
    /// Create a file storage for `path`; nothing is touched on disk yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            stored_len: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the parent directory if needed
    pub async fn ensure_directory(&self) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || fs::try_exists(parent).await.unwrap_or(false) {
            return Ok(());
        }

        debug!("Creating target directory: {}", parent.display());
        fs::create_dir_all(parent).await.map_err(|e| {
            error!("Failed to create directory '{}': {}", parent.display(), e);
            XdccError::storage_error_full("Failed to create directory", parent.display().to_string(), e.to_string())
        })?;
        Ok(())
    }

    /// Size of an existing file, `None` if it does not exist
    pub async fn file_len(path: &Path) -> Result<Option<u64>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("Failed to stat '{}': {}", path.display(), e);
                Err(XdccError::storage_error_full("Failed to stat file", path.display().to_string(), e.to_string()).into())
            }
        }
    }

    fn storage_error(&self, message: &str, e: std::io::Error) -> anyhow::Error {
        error!("{} '{}': {}", message, self.path.display(), e);
        XdccError::storage_error_full(message, self.path.display().to_string(), e.to_string()).into()
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn existing_len(&self) -> Result<Option<u64>> {
        Self::file_len(&self.path).await
    }

    async fn open(&mut self, offset: u64) -> Result<()> {
        self.ensure_directory().await?;

        if offset == 0 {
            info!("Creating file: {}", self.path.display());
            let file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .await
                .map_err(|e| self.storage_error("Failed to create file", e))?;
            self.file = Some(file);
            self.stored_len = 0;
            return Ok(());
        }

        info!("Appending to file at offset {}: {}", offset, self.path.display());
        let file = fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.storage_error("Failed to open file for append", e))?;

        let current = file
            .metadata()
            .await
            .map_err(|e| self.storage_error("Failed to stat file", e))?
            .len();

        if current < offset {
            return Err(XdccError::storage_error_full(
                "Resume offset beyond end of file",
                self.path.display().to_string(),
                format!("offset {} > length {}", offset, current),
            )
            .into());
        }
        if current > offset {
            debug!("Truncating {} from {} to {} bytes", self.path.display(), current, offset);
            file.set_len(offset)
                .await
                .map_err(|e| self.storage_error("Failed to truncate file", e))?;
        }

        self.file = Some(file);
        self.stored_len = offset;
        Ok(())
    }

    async fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(XdccError::storage_error_with_path("File is not open", self.path.display().to_string()).into());
        };
        if let Err(e) = file.write_all(data).await {
            return Err(self.storage_error("Failed to write chunk", e));
        }
        self.stored_len += data.len() as u64;
        trace!("Wrote {} bytes to {} ({} total)", data.len(), self.path.display(), self.stored_len);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        if let Err(e) = file.flush().await {
            return Err(self.storage_error("Failed to flush file", e));
        }
        if let Err(e) = file.sync_all().await {
            return Err(self.storage_error("Failed to sync file", e));
        }
        debug!("Closed {} at {} bytes", self.path.display(), self.stored_len);
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::File
    }

    fn metadata(&self) -> StorageMetadata {
        StorageMetadata {
            storage_type: StorageType::File,
            path: Some(self.path.clone()),
            stored_len: self.stored_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("a.bin");
        let mut storage = FileStorage::new(&path);

        assert_eq!(storage.existing_len().await.unwrap(), None);
        storage.open(0).await.unwrap();
        storage.write_chunk(&[1u8; 10]).await.unwrap();
        storage.finish().await.unwrap();

        assert_eq!(FileStorage::file_len(&path).await.unwrap(), Some(10));
        assert_eq!(storage.metadata().stored_len, 10);
        assert_eq!(storage.storage_type(), StorageType::File);
    }

    #[tokio::test]
    async fn test_open_zero_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        tokio::fs::write(&path, vec![7u8; 40]).await.unwrap();

        let mut storage = FileStorage::new(&path);
        storage.open(0).await.unwrap();
        storage.finish().await.unwrap();
        assert_eq!(FileStorage::file_len(&path).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_append_from_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        tokio::fs::write(&path, vec![1u8; 40]).await.unwrap();

        let mut storage = FileStorage::new(&path);
        assert_eq!(storage.existing_len().await.unwrap(), Some(40));
        storage.open(40).await.unwrap();
        storage.write_chunk(&[2u8; 60]).await.unwrap();
        storage.finish().await.unwrap();

        let data = tokio::fs::read(&path).await.unwrap();
        assert_eq!(data.len(), 100);
        assert!(data[..40].iter().all(|&b| b == 1));
        assert!(data[40..].iter().all(|&b| b == 2));
    }

    #[tokio::test]
    async fn test_append_truncates_to_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        tokio::fs::write(&path, vec![1u8; 40]).await.unwrap();

        let mut storage = FileStorage::new(&path);
        storage.open(30).await.unwrap();
        storage.write_chunk(&[2u8; 5]).await.unwrap();
        storage.finish().await.unwrap();

        assert_eq!(FileStorage::file_len(&path).await.unwrap(), Some(35));
    }

    #[tokio::test]
    async fn test_offset_beyond_end_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        tokio::fs::write(&path, vec![1u8; 10]).await.unwrap();

        let mut storage = FileStorage::new(&path);
        assert!(storage.open(20).await.is_err());
    }

    #[tokio::test]
    async fn test_write_without_open_fails() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path().join("a.bin"));
        assert!(storage.write_chunk(b"x").await.is_err());
        assert!(storage.finish().await.is_ok());
    }
}
