//! # RocksDB Storage Adapter
//!
//! Production-ready RocksDB implementation of the KeyValueStore trait.
//!
//! ## Features
//!
//! - Atomic batch writes (WriteBatch)
//! - Snappy compression
//! - Bloom filters for read optimization
//! - Write-ahead logging for durability
//!
//! Keys are compared bytewise, which is the ordering `KvEntityStore`
//! relies on for deterministic set pages.

use ql_01_entity_store::{BatchOperation, KeyValueStore, StoreError};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::Path;

/// RocksDB configuration for production use
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 256MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 3)
    pub max_write_buffer_number: i32,
    /// Target file size for level-1 (default: 64MB)
    pub target_file_size_base: u64,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/entities".to_string(),
            block_cache_size: 256 * 1024 * 1024, // 256MB
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
            target_file_size_base: 64 * 1024 * 1024, // 64MB
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,  // 8MB
            write_buffer_size: 4 * 1024 * 1024, // 4MB
            max_write_buffer_number: 2,
            target_file_size_base: 4 * 1024 * 1024, // 4MB
            sync_writes: false,
        }
    }
}

fn io_error(operation: &str, e: rocksdb::Error) -> StoreError {
    StoreError::IOError {
        message: format!("RocksDB {} failed: {}", operation, e),
    }
}

/// RocksDB-backed key-value store implementing the KeyValueStore trait
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create a RocksDB database
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // Performance tuning
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_target_file_size_base(config.target_file_size_base);

        // Compression
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        // Bloom filter for faster lookups
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| io_error("open", e))?;
        Ok(Self { db, config })
    }

    /// Open with default tuning (for simple use cases)
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let config = RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::open(config)
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.get(key).map_err(|e| io_error("get", e))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| io_error("put", e))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(|e| io_error("delete", e))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        if operations.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    batch.put(&key, &value);
                }
                BatchOperation::Delete { key } => {
                    batch.delete(&key);
                }
            }
        }

        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| io_error("batch write", e))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        self.db
            .get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("exists check", e))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut results = Vec::new();

        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_01_entity_store::{EntityStore, InMemoryEntityStore, KvEntityStore};
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, RocksDbStore) {
        let dir = TempDir::new().unwrap();
        let config = RocksDbConfig::for_testing(dir.path().to_string_lossy().to_string());
        (dir, RocksDbStore::open(config).unwrap())
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, mut store) = open_temp();
        store.put(b"key", b"value").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));
        assert!(store.exists(b"key").unwrap());
        store.delete(b"key").unwrap();
        assert!(!store.exists(b"key").unwrap());
    }

    #[test]
    fn test_batch_and_prefix_scan() {
        let (_dir, mut store) = open_temp();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"s:b".to_vec(), Vec::new()),
                BatchOperation::put(b"s:a".to_vec(), Vec::new()),
                BatchOperation::put(b"t:a".to_vec(), Vec::new()),
            ])
            .unwrap();
        let keys: Vec<_> = store
            .prefix_scan(b"s:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"s:a".to_vec(), b"s:b".to_vec()]);
    }

    #[test]
    fn test_entity_store_hash_matches_in_memory() {
        let (_dir, db) = open_temp();
        let rocks = KvEntityStore::new(db);
        let memory = InMemoryEntityStore::new();
        for store in [&rocks as &dyn EntityStore, &memory as &dyn EntityStore] {
            store.save_object("wallet:by_id:1", vec![1, 2, 3]).unwrap();
            store
                .add_to_sets(&["wallets".to_string(), "wallets:by_creator:aa".to_string()], "1")
                .unwrap();
        }
        assert_eq!(rocks.state_hash().unwrap(), memory.state_hash().unwrap());
    }
}
