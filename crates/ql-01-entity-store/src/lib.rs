//! # Entity Store (ql-01)
//!
//! The Entity Store is the persistence layer every replica of the ledger
//! runs identically. It stores schema-described entities as compact records,
//! maintains deterministic secondary indices, and reconstructs live entities
//! on read.
//!
//! ## Layers
//!
//! ```text
//! MetaData / Representation  (schema: codec, storable record, keynames, sync hook)
//!            │
//!            ↓
//!        PartialSet          (paginated result: index / amount / total / is_last)
//!            │
//!            ↓
//!   EntityRepository         (read path: by id, by keyname, by intersection)
//!            │
//!            ↓
//!     EntityService          (write path: save / delete with index maintenance)
//!            │
//!            ↓
//!     EntityStore port       (objects + ordered sets; in-memory or key/value backed)
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement |
//! |----|-----------|-------------|
//! | 1 | Save is not an upsert | `EntityService::save` rejects an existing id |
//! | 2 | Index symmetry | the same `keynames()` drive insertion and removal |
//! | 3 | Pagination | `PartialSet::new` rejects `index + amount > total` |
//! | 4 | Deterministic order | set members are ordered by id string |
//! | 5 | No half-indexed entity | partial index registration is reverted |
//!
//! ## Encodings
//!
//! - Storable records (nested entities referenced by id): `bincode`
//! - Normalized values (nested entities inlined): JSON
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use ql_01_entity_store::{EntityRepository, EntityService, InMemoryEntityStore};
//!
//! let store = Arc::new(InMemoryEntityStore::new());
//! let service = EntityService::new(store.clone());
//! service.save(&wallet, &WalletRepresentation)?;
//!
//! let repository = EntityRepository::new(store);
//! let page = repository.retrieve_set_by_keyname(&WalletRepresentation, "wallets", 0, 20)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod registry;
pub mod repository;
pub mod service;

#[cfg(test)]
mod fixtures;

// Re-export main types for convenience
pub use adapters::{InMemoryEntityStore, InMemoryKVStore, KvEntityStore};
pub use domain::{
    intersection_keyname, keyname_by_id, Entity, EntityData, EntityError, EntityOf, EntityResult,
    MetaData, NormalizedOf, NormalizedPartialSet, PartialSet, Representation, StorableOf,
    MIN_NAME_LENGTH,
};
pub use ports::{BatchOperation, EntityStore, KeyValueStore, StoreError};
pub use registry::{EntityRegistry, EntityRegistryBuilder, TaggedEntity};
pub use repository::EntityRepository;
pub use service::EntityService;
