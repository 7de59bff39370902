//! # Adapters Layer
//!
//! Storage adapters implementing the [`EntityStore`](crate::ports::EntityStore)
//! port.
//!
//! - [`InMemoryEntityStore`]: ordered maps behind a lock, for tests and
//!   single-process nodes
//! - [`KvEntityStore`]: objects and sets laid out over any
//!   [`KeyValueStore`](crate::ports::KeyValueStore)
//! - [`InMemoryKVStore`]: sorted in-memory key/value backend

pub mod kv;
pub mod memory;

pub use kv::{InMemoryKVStore, KvEntityStore};
pub use memory::InMemoryEntityStore;

use sha3::{Digest, Sha3_256};
use shared_types::Hash;

/// Incremental state digest shared by every adapter.
///
/// Objects must be fed in ascending key order first, then set members in
/// ascending `(set, member)` order. Every field is length-prefixed so that
/// adjacent fields cannot be confused.
pub(crate) struct StateHasher {
    hasher: Sha3_256,
}

impl StateHasher {
    pub(crate) fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    pub(crate) fn object(&mut self, key: &str, value: &[u8]) {
        self.hasher.update(b"o");
        self.field(key.as_bytes());
        self.field(value);
    }

    pub(crate) fn member(&mut self, set: &str, member: &str) {
        self.hasher.update(b"s");
        self.field(set.as_bytes());
        self.field(member.as_bytes());
    }

    pub(crate) fn finalize(self) -> Hash {
        self.hasher.finalize().into()
    }

    fn field(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_boundaries_are_distinguished() {
        let mut a = StateHasher::new();
        a.object("ab", b"c");
        let mut b = StateHasher::new();
        b.object("a", b"bc");
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_empty_state_hash_is_stable() {
        assert_eq!(StateHasher::new().finalize(), StateHasher::new().finalize());
    }
}
