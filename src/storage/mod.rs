//! Storage module
//!
//! Owns the on-disk file a DCC transfer writes into, including resume
//! offsets and directory creation.

pub mod backend;
pub mod file;

// Re-export backend types
pub use backend::{MemoryStorage, StorageBackend, StorageMetadata, StorageType};

// Re-export file storage types
pub use file::FileStorage;
