//! Durable key-value storage.
//!
//! Backends implement [`KeyValueStore`]; everything above works on typed keys
//! through [`UserDataStore`] and [`SubPrefixStore`].

pub mod keys;
pub mod list;
pub mod memory;
pub mod rocks;
pub mod user;

use async_trait::async_trait;

use crate::error::StoreError;

pub use keys::{DataType, Partition};
pub use memory::MemoryStore;
pub use rocks::RocksDbStore;
pub use user::{LogChannel, SubPrefixStore, UserDataStore};

/// Result of a prefix scan: `(key, value)` pairs in key order.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Raw byte-oriented storage shared across sessions.
///
/// Implementations must be safe for concurrent use from different sessions.
/// Each `put` is independently durable; there are no multi-key transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key. Missing keys are `StoreError::NotFound`.
    async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    /// Put a single key-value pair.
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// All pairs whose key starts with `prefix`, in key order.
    async fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError>;

    /// Flush pending writes and refuse further writes.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
