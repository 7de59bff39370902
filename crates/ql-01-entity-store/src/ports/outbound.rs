//! # Outbound Ports (Driven Ports)
//!
//! Storage capabilities the entity store requires from the host.
//!
//! Two levels are exposed:
//!
//! - [`EntityStore`]: objects plus ordered sets, the shape the service and
//!   the repository are written against.
//! - [`KeyValueStore`]: a plain ordered key/value backend. `KvEntityStore`
//!   lays objects and sets out on top of it, so a production database only
//!   has to implement this narrower trait.

use shared_types::Hash;
use std::fmt;

/// Object and ordered-set storage.
///
/// Production: `KvEntityStore` over RocksDB (node-runtime)
/// Testing: `InMemoryEntityStore`
///
/// ## Determinism
///
/// Set members are returned in lexicographic order, and [`state_hash`]
/// depends only on logical content. Two replicas that applied the same
/// operations return identical pages and identical hashes.
///
/// [`state_hash`]: EntityStore::state_hash
pub trait EntityStore: Send + Sync {
    /// Store `value` under `key`. Returns the number of objects written.
    fn save_object(&self, key: &str, value: Vec<u8>) -> Result<usize, StoreError>;

    /// Read the object stored under `key`.
    fn retrieve_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete every object in `keys`. Returns how many existed.
    fn delete_objects(&self, keys: &[String]) -> Result<usize, StoreError>;

    /// Add `member` to each set. Returns the number of sets that now
    /// contain it and did not before.
    fn add_to_sets(&self, keys: &[String], member: &str) -> Result<usize, StoreError>;

    /// Remove `member` from each set. Returns how many sets contained it.
    fn remove_from_sets(&self, keys: &[String], member: &str) -> Result<usize, StoreError>;

    /// Up to `amount` members of a set starting at `index`, in order.
    fn retrieve_set(&self, key: &str, index: usize, amount: usize)
        -> Result<Vec<String>, StoreError>;

    /// Number of members of a set (0 when absent).
    fn set_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Store the intersection of `sources` under `destination`, replacing
    /// any previous content. Returns the size of the intersection.
    fn intersect_store(&self, destination: &str, sources: &[String])
        -> Result<usize, StoreError>;

    /// Delete whole sets. Returns how many existed.
    fn delete_sets(&self, keys: &[String]) -> Result<usize, StoreError>;

    /// SHA3-256 digest of the full logical content.
    fn state_hash(&self) -> Result<Hash, StoreError>;
}

/// Ordered key/value backend.
///
/// Production: `RocksDbStore` (node-runtime/adapters/storage/rocksdb_adapter.rs)
/// Testing: `InMemoryKVStore`
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// Every pair whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Storage backend errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// I/O error during read/write.
    IOError { message: String },
    /// Data corruption in the store.
    CorruptionError { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IOError { message } => write!(f, "Store I/O error: {}", message),
            StoreError::CorruptionError { message } => {
                write!(f, "Store corruption: {}", message)
            }
        }
    }
}

impl std::error::Error for StoreError {}
