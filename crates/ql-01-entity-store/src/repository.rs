//! # Entity Repository (read path)
//!
//! Resolves entities by id, by index intersection, or as paginated sets,
//! reconstructing live entities through their [`MetaData`].

use crate::domain::{
    intersection_keyname, keyname_by_id, EntityData, EntityError, EntityResult, MetaData,
    PartialSet,
};
use crate::ports::EntityStore;
use shared_types::EntityId;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read access to the entity store.
///
/// Holds no cache: every call goes to the store, so index membership is
/// always read fresh.
#[derive(Clone)]
pub struct EntityRepository {
    store: Arc<dyn EntityStore>,
}

impl EntityRepository {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Whether an entity of the given type exists under `id`.
    pub fn exists<M: MetaData + ?Sized>(&self, metadata: &M, id: &EntityId) -> EntityResult<bool> {
        let key = keyname_by_id(&metadata.keyname(), id);
        Ok(self.store.retrieve_object(&key)?.is_some())
    }

    /// Retrieve one entity by id.
    pub fn retrieve_by_id<M: MetaData + ?Sized>(
        &self,
        metadata: &M,
        id: &EntityId,
    ) -> EntityResult<M::Entity> {
        let key = keyname_by_id(&metadata.keyname(), id);
        let record = self
            .store
            .retrieve_object(&key)?
            .ok_or_else(|| EntityError::NotFound {
                entity: metadata.name().to_string(),
                id: *id,
            })?;
        let storable = metadata.decode_storable(&record)?;
        metadata.to_entity(self, EntityData::Storable(storable))
    }

    /// Retrieve the single entity registered in every one of `keynames`.
    ///
    /// ## Errors
    ///
    /// - `NoMatch` when the intersection is empty
    /// - `AmbiguousMatch` when it holds more than one entity
    pub fn retrieve_by_intersect_keynames<M: MetaData + ?Sized>(
        &self,
        metadata: &M,
        keynames: &[String],
    ) -> EntityResult<M::Entity> {
        let set = self.retrieve_set_by_intersect_keynames(metadata, keynames, 0, 2)?;
        match set.total_amount() {
            0 => Err(EntityError::NoMatch {
                entity: metadata.name().to_string(),
                keynames: keynames.join(","),
            }),
            1 => set
                .into_instances()
                .into_iter()
                .next()
                .ok_or_else(|| EntityError::NoMatch {
                    entity: metadata.name().to_string(),
                    keynames: keynames.join(","),
                }),
            count => Err(EntityError::AmbiguousMatch {
                entity: metadata.name().to_string(),
                keynames: keynames.join(","),
                count,
            }),
        }
    }

    /// Retrieve a page of the entities indexed under `keyname`.
    ///
    /// Members whose primary record is missing are skipped with a warning;
    /// `total_amount` remains the full index cardinality.
    pub fn retrieve_set_by_keyname<M: MetaData + ?Sized>(
        &self,
        metadata: &M,
        keyname: &str,
        index: usize,
        amount: usize,
    ) -> EntityResult<PartialSet<M::Entity>> {
        let total = self.store.set_len(keyname)?;
        if index > total {
            return Err(EntityError::InvalidPartialSet {
                index,
                amount,
                total,
            });
        }

        let members = self.store.retrieve_set(keyname, index, amount)?;
        let mut instances = Vec::with_capacity(members.len());
        for member in members {
            let id = shared_types::parse_entity_id(&member)
                .map_err(|e| EntityError::decode(metadata.name(), e))?;
            match self.retrieve_by_id(metadata, &id) {
                Ok(entity) => instances.push(entity),
                Err(EntityError::NotFound { .. }) => {
                    warn!(
                        entity = metadata.name(),
                        keyname,
                        %id,
                        "Skipping orphaned index member"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            entity = metadata.name(),
            keyname,
            index,
            amount = instances.len(),
            total,
            "Retrieved partial set"
        );
        PartialSet::new(instances, index, total)
    }

    /// Retrieve a page of the entities registered in every one of `keynames`.
    ///
    /// The intersection is materialized under a transient destination key
    /// that is deleted before returning.
    pub fn retrieve_set_by_intersect_keynames<M: MetaData + ?Sized>(
        &self,
        metadata: &M,
        keynames: &[String],
        index: usize,
        amount: usize,
    ) -> EntityResult<PartialSet<M::Entity>> {
        if keynames.is_empty() {
            return Err(EntityError::validation(
                metadata.name(),
                "at least one keyname is required",
            ));
        }

        let destination = intersection_keyname(keynames);
        let count = self.store.intersect_store(&destination, keynames)?;
        if count == 0 {
            self.store.delete_sets(std::slice::from_ref(&destination))?;
            if index > 0 {
                return Err(EntityError::InvalidPartialSet {
                    index,
                    amount,
                    total: 0,
                });
            }
            return Ok(PartialSet::empty());
        }

        let result = self.retrieve_set_by_keyname(metadata, &destination, index, amount);
        self.store.delete_sets(std::slice::from_ref(&destination))?;
        result
    }
}
