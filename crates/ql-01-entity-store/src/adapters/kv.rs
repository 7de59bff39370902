//! Entity storage over an ordered key/value backend.
//!
//! ## Layout
//!
//! | Kind | Key | Value |
//! |------|-----|-------|
//! | object | `o:<key>` | record bytes |
//! | set member | `s:<set>\0<member>` | empty |
//!
//! A prefix scan over `s:<set>\0` yields the members of one set in
//! lexicographic order, which is also the order the in-memory adapter
//! returns, so both adapters page and hash identically.

use super::StateHasher;
use crate::ports::{BatchOperation, EntityStore, KeyValueStore, StoreError};
use parking_lot::RwLock;
use shared_types::Hash;
use std::collections::{BTreeMap, BTreeSet};

const OBJECT_PREFIX: &[u8] = b"o:";
const SET_PREFIX: &[u8] = b"s:";
const SEPARATOR: u8 = 0;

fn object_key(key: &str) -> Vec<u8> {
    let mut out = OBJECT_PREFIX.to_vec();
    out.extend_from_slice(key.as_bytes());
    out
}

fn set_prefix(set: &str) -> Vec<u8> {
    let mut out = SET_PREFIX.to_vec();
    out.extend_from_slice(set.as_bytes());
    out.push(SEPARATOR);
    out
}

fn member_key(set: &str, member: &str) -> Vec<u8> {
    let mut out = set_prefix(set);
    out.extend_from_slice(member.as_bytes());
    out
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.as_bytes().contains(&SEPARATOR) {
        return Err(StoreError::IOError {
            message: format!("key contains a NUL byte: {:?}", key),
        });
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<String, StoreError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| StoreError::CorruptionError {
        message: e.to_string(),
    })
}

/// [`EntityStore`] adapter over any [`KeyValueStore`].
///
/// Multi-key set updates are applied as a single atomic batch.
pub struct KvEntityStore<K: KeyValueStore> {
    kv: RwLock<K>,
}

impl<K: KeyValueStore> KvEntityStore<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv: RwLock::new(kv),
        }
    }

    fn members(kv: &K, set: &str) -> Result<Vec<String>, StoreError> {
        let prefix = set_prefix(set);
        kv.prefix_scan(&prefix)?
            .into_iter()
            .map(|(key, _)| utf8(&key[prefix.len()..]))
            .collect()
    }
}

impl<K: KeyValueStore> EntityStore for KvEntityStore<K> {
    fn save_object(&self, key: &str, value: Vec<u8>) -> Result<usize, StoreError> {
        self.kv.write().put(&object_key(key), &value)?;
        Ok(1)
    }

    fn retrieve_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.kv.read().get(&object_key(key))
    }

    fn delete_objects(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut kv = self.kv.write();
        let mut operations = Vec::new();
        let mut seen = BTreeSet::new();
        for key in keys {
            let raw = object_key(key);
            if seen.insert(raw.clone()) && kv.exists(&raw)? {
                operations.push(BatchOperation::delete(raw));
            }
        }
        let deleted = operations.len();
        kv.atomic_batch_write(operations)?;
        Ok(deleted)
    }

    fn add_to_sets(&self, keys: &[String], member: &str) -> Result<usize, StoreError> {
        check_key(member)?;
        let mut kv = self.kv.write();
        let mut operations = Vec::new();
        let mut seen = BTreeSet::new();
        for key in keys {
            check_key(key)?;
            let raw = member_key(key, member);
            if seen.insert(raw.clone()) && !kv.exists(&raw)? {
                operations.push(BatchOperation::put(raw, Vec::new()));
            }
        }
        let added = operations.len();
        kv.atomic_batch_write(operations)?;
        Ok(added)
    }

    fn remove_from_sets(&self, keys: &[String], member: &str) -> Result<usize, StoreError> {
        let mut kv = self.kv.write();
        let mut operations = Vec::new();
        let mut seen = BTreeSet::new();
        for key in keys {
            let raw = member_key(key, member);
            if seen.insert(raw.clone()) && kv.exists(&raw)? {
                operations.push(BatchOperation::delete(raw));
            }
        }
        let removed = operations.len();
        kv.atomic_batch_write(operations)?;
        Ok(removed)
    }

    fn retrieve_set(
        &self,
        key: &str,
        index: usize,
        amount: usize,
    ) -> Result<Vec<String>, StoreError> {
        let kv = self.kv.read();
        Ok(Self::members(&kv, key)?
            .into_iter()
            .skip(index)
            .take(amount)
            .collect())
    }

    fn set_len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.kv.read().prefix_scan(&set_prefix(key))?.len())
    }

    fn intersect_store(&self, destination: &str, sources: &[String]) -> Result<usize, StoreError> {
        check_key(destination)?;
        let mut kv = self.kv.write();
        let mut result: Option<BTreeSet<String>> = None;
        for source in sources {
            let members: BTreeSet<String> = Self::members(&kv, source)?.into_iter().collect();
            result = Some(match result {
                None => members,
                Some(acc) => acc.intersection(&members).cloned().collect(),
            });
        }
        let result = result.unwrap_or_default();

        let mut operations: Vec<BatchOperation> = Self::members(&kv, destination)?
            .iter()
            .map(|m| BatchOperation::delete(member_key(destination, m)))
            .collect();
        operations.extend(
            result
                .iter()
                .map(|m| BatchOperation::put(member_key(destination, m), Vec::new())),
        );
        kv.atomic_batch_write(operations)?;
        Ok(result.len())
    }

    fn delete_sets(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut kv = self.kv.write();
        let mut operations = Vec::new();
        let mut deleted = 0;
        let mut seen = BTreeSet::new();
        for key in keys {
            if !seen.insert(key.as_str()) {
                continue;
            }
            let entries = kv.prefix_scan(&set_prefix(key))?;
            if !entries.is_empty() {
                deleted += 1;
            }
            operations.extend(entries.into_iter().map(|(raw, _)| BatchOperation::delete(raw)));
        }
        kv.atomic_batch_write(operations)?;
        Ok(deleted)
    }

    fn state_hash(&self) -> Result<Hash, StoreError> {
        let kv = self.kv.read();
        let mut hasher = StateHasher::new();
        for (raw, value) in kv.prefix_scan(OBJECT_PREFIX)? {
            hasher.object(&utf8(&raw[OBJECT_PREFIX.len()..])?, &value);
        }
        for (raw, _) in kv.prefix_scan(SET_PREFIX)? {
            let body = &raw[SET_PREFIX.len()..];
            let split = body
                .iter()
                .position(|b| *b == SEPARATOR)
                .ok_or_else(|| StoreError::CorruptionError {
                    message: "set member key without separator".to_string(),
                })?;
            hasher.member(&utf8(&body[..split])?, &utf8(&body[split + 1..])?);
        }
        Ok(hasher.finalize())
    }
}

/// Sorted in-memory key/value store.
///
/// Batches are applied under the caller's exclusive borrow, so they are
/// trivially atomic.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
