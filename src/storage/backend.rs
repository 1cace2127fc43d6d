//! Storage backend abstraction for DCC downloads
//!
//! The DCC transfer writes through this trait so that the receive loop does
//! not care whether bytes land on disk or in memory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Abstract storage backend for a single downloaded file
#[async_trait]
pub trait StorageBackend: Send {
    /// Number of bytes already stored for this download, `None` if nothing exists yet
    async fn existing_len(&self) -> Result<Option<u64>>;

    /// Prepare for writing so that the next byte lands at `offset`
    ///
    /// `offset == 0` starts from scratch and discards any previous content.
    /// A non-zero offset appends; stored data beyond `offset` is cut off, and
    /// an offset past the stored length is an error.
    async fn open(&mut self, offset: u64) -> Result<()>;

    /// Append a chunk
    async fn write_chunk(&mut self, data: &[u8]) -> Result<()>;

    /// Flush everything written so far and release the handle
    async fn finish(&mut self) -> Result<()>;

    /// Get storage type identifier
    fn storage_type(&self) -> StorageType;

    /// Get storage-specific metadata
    fn metadata(&self) -> StorageMetadata;
}

/// Storage type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Local filesystem storage
    File,
    /// In-memory buffer
    Memory,
}

/// Storage-specific metadata
#[derive(Debug, Clone)]
pub struct StorageMetadata {
    pub storage_type: StorageType,
    pub path: Option<PathBuf>,
    pub stored_len: u64,
}

/// Keeps the download in a `Vec<u8>`
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Option<Vec<u8>>,
    open: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `data` already "on disk", as after an interrupted attempt
    pub fn with_existing(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            open: false,
        }
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn existing_len(&self) -> Result<Option<u64>> {
        Ok(self.data.as_ref().map(|d| d.len() as u64))
    }

    async fn open(&mut self, offset: u64) -> Result<()> {
        let data = self.data.get_or_insert_with(Vec::new);
        if offset > data.len() as u64 {
            return Err(anyhow!("Resume offset {} beyond stored length {}", offset, data.len()));
        }
        data.truncate(offset as usize);
        self.open = true;
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        match (&mut self.data, self.open) {
            (Some(data), true) => {
                data.extend_from_slice(chunk);
                Ok(())
            }
            _ => Err(anyhow!("Memory storage is not open")),
        }
    }

    async fn finish(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }

    fn metadata(&self) -> StorageMetadata {
        StorageMetadata {
            storage_type: StorageType::Memory,
            path: None,
            stored_len: self.data().len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_fresh() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.existing_len().await.unwrap(), None);

        storage.open(0).await.unwrap();
        storage.write_chunk(b"hello").await.unwrap();
        storage.finish().await.unwrap();

        assert_eq!(storage.data(), b"hello");
        assert_eq!(storage.metadata().stored_len, 5);
        assert!(storage.write_chunk(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_storage_resume() {
        let mut storage = MemoryStorage::with_existing(b"abcdef".to_vec());
        assert_eq!(storage.existing_len().await.unwrap(), Some(6));

        storage.open(4).await.unwrap();
        storage.write_chunk(b"XY").await.unwrap();
        assert_eq!(storage.data(), b"abcdXY");

        assert!(storage.open(10).await.is_err());
    }
}
