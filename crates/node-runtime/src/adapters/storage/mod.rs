//! # Production Storage Adapters
//!
//! Production-ready storage backends using RocksDB.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature to use these adapters:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! The entity store lays its objects and index sets out over the
//! [`KeyValueStore`](ql_01_entity_store::KeyValueStore) port through
//! `KvEntityStore`, so RocksDB only has to provide ordered keys and atomic
//! batches.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

// Re-export in-memory adapters for testing
pub use ql_01_entity_store::{InMemoryEntityStore, InMemoryKVStore};
