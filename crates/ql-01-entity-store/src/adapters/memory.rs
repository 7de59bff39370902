use super::StateHasher;
use crate::ports::{EntityStore, StoreError};
use parking_lot::RwLock;
use shared_types::Hash;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory implementation of EntityStore.
///
/// Empty sets are dropped so that a set which lost its last member is
/// indistinguishable from one that never existed.
pub struct InMemoryEntityStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    sets: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            sets: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Number of non-empty sets.
    pub fn set_count(&self) -> usize {
        self.sets.read().len()
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn save_object(&self, key: &str, value: Vec<u8>) -> Result<usize, StoreError> {
        self.objects.write().insert(key.to_string(), value);
        Ok(1)
    }

    fn retrieve_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.objects.read().get(key).cloned())
    }

    fn delete_objects(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut objects = self.objects.write();
        Ok(keys.iter().filter(|k| objects.remove(*k).is_some()).count())
    }

    fn add_to_sets(&self, keys: &[String], member: &str) -> Result<usize, StoreError> {
        let mut sets = self.sets.write();
        let mut added = 0;
        for key in keys {
            if sets
                .entry(key.clone())
                .or_default()
                .insert(member.to_string())
            {
                added += 1;
            }
        }
        Ok(added)
    }

    fn remove_from_sets(&self, keys: &[String], member: &str) -> Result<usize, StoreError> {
        let mut sets = self.sets.write();
        let mut removed = 0;
        for key in keys {
            if let Some(set) = sets.get_mut(key) {
                if set.remove(member) {
                    removed += 1;
                }
                if set.is_empty() {
                    sets.remove(key);
                }
            }
        }
        Ok(removed)
    }

    fn retrieve_set(
        &self,
        key: &str,
        index: usize,
        amount: usize,
    ) -> Result<Vec<String>, StoreError> {
        let sets = self.sets.read();
        Ok(sets
            .get(key)
            .map(|set| set.iter().skip(index).take(amount).cloned().collect())
            .unwrap_or_default())
    }

    fn set_len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.sets.read().get(key).map_or(0, BTreeSet::len))
    }

    fn intersect_store(&self, destination: &str, sources: &[String]) -> Result<usize, StoreError> {
        let mut sets = self.sets.write();
        let mut result: Option<BTreeSet<String>> = None;
        for source in sources {
            let members = sets.get(source).cloned().unwrap_or_default();
            result = Some(match result {
                None => members,
                Some(acc) => acc.intersection(&members).cloned().collect(),
            });
        }
        let result = result.unwrap_or_default();
        let len = result.len();
        if result.is_empty() {
            sets.remove(destination);
        } else {
            sets.insert(destination.to_string(), result);
        }
        Ok(len)
    }

    fn delete_sets(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut sets = self.sets.write();
        Ok(keys.iter().filter(|k| sets.remove(*k).is_some()).count())
    }

    fn state_hash(&self) -> Result<Hash, StoreError> {
        let objects = self.objects.read();
        let sets = self.sets.read();
        let mut hasher = StateHasher::new();
        for (key, value) in objects.iter() {
            hasher.object(key, value);
        }
        for (key, members) in sets.iter() {
            for member in members {
                hasher.member(key, member);
            }
        }
        Ok(hasher.finalize())
    }
}
