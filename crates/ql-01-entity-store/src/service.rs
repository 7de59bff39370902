//! # Entity Service (write path)
//!
//! Persists and removes entities while keeping their index memberships in
//! step with the primary record.
//!
//! ## Save
//!
//! 1. Reject an id that already exists (Save is never an upsert).
//! 2. Run the `sync` hook. It may cascade-save dependents or reject.
//! 3. Persist the storable record under `<keyname>:by_id:<uuid>`.
//! 4. Register the id in every declared keyname. Memberships left behind
//!    by an earlier partial delete are cleared first. A partial
//!    registration is reverted together with the primary record.
//!
//! ## Delete
//!
//! 1. Require the entity to exist.
//! 2. Run the `before_delete` guard.
//! 3. Remove the primary record.
//! 4. Remove every declared index membership; a shortfall is only logged.

use crate::domain::{
    dedup_keynames, keyname_by_id, Entity, EntityError, EntityOf, EntityResult, MetaData,
    Representation,
};
use crate::ports::EntityStore;
use crate::repository::EntityRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Write access to the entity store.
#[derive(Clone)]
pub struct EntityService {
    store: Arc<dyn EntityStore>,
}

impl EntityService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// A repository reading from the same store.
    pub fn repository(&self) -> EntityRepository {
        EntityRepository::new(self.store.clone())
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Persist a new entity and register it in its indices.
    pub fn save<R: Representation>(
        &self,
        entity: &EntityOf<R>,
        representation: &R,
    ) -> EntityResult<()> {
        let metadata = representation.metadata();
        let name = metadata.name();
        let id = entity.id();
        let primary = keyname_by_id(&metadata.keyname(), &id);

        if self.store.retrieve_object(&primary)?.is_some() {
            return Err(EntityError::AlreadyExists {
                entity: name.to_string(),
                id,
            });
        }

        representation.sync(self, entity)?;

        let keynames = dedup_keynames(representation.keynames(entity)?);
        let storable = representation.to_storable(entity)?;
        let record = metadata.encode_storable(&storable)?;

        if self.store.save_object(&primary, record)? != 1 {
            return Err(EntityError::WriteFailed { key: primary });
        }

        if keynames.is_empty() {
            info!(entity = name, %id, "Saved entity");
            return Ok(());
        }

        let member = id.to_string();
        match self.store.remove_from_sets(&keynames, &member) {
            Ok(0) => {}
            Ok(stale) => {
                warn!(entity = name, %id, stale, "Cleared stale index memberships");
            }
            Err(e) => {
                self.revert_save(name, &primary, &keynames, &member);
                return Err(e.into());
            }
        }
        let added = match self.store.add_to_sets(&keynames, &member) {
            Ok(added) => added,
            Err(e) => {
                self.revert_save(name, &primary, &keynames, &member);
                return Err(e.into());
            }
        };
        if added != keynames.len() {
            self.revert_save(name, &primary, &keynames, &member);
            return Err(EntityError::IndexRegistration {
                entity: name.to_string(),
                id,
                added,
                expected: keynames.len(),
            });
        }

        info!(entity = name, %id, keynames = keynames.len(), "Saved entity");
        Ok(())
    }

    /// Remove an existing entity and its index memberships.
    pub fn delete<R: Representation>(
        &self,
        entity: &EntityOf<R>,
        representation: &R,
    ) -> EntityResult<()> {
        let metadata = representation.metadata();
        let name = metadata.name();
        let id = entity.id();
        let primary = keyname_by_id(&metadata.keyname(), &id);

        if self.store.retrieve_object(&primary)?.is_none() {
            return Err(EntityError::NotFound {
                entity: name.to_string(),
                id,
            });
        }

        representation.before_delete(self, entity)?;
        let keynames = dedup_keynames(representation.keynames(entity)?);

        if self.store.delete_objects(std::slice::from_ref(&primary))? != 1 {
            return Err(EntityError::WriteFailed { key: primary });
        }

        if !keynames.is_empty() {
            let member = id.to_string();
            match self.store.remove_from_sets(&keynames, &member) {
                Ok(removed) if removed != keynames.len() => {
                    warn!(
                        entity = name,
                        %id,
                        removed,
                        expected = keynames.len(),
                        "Index memberships partially removed"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(entity = name, %id, error = %e, "Failed to remove index memberships");
                }
            }
        }

        info!(entity = name, %id, "Deleted entity");
        Ok(())
    }

    /// Best-effort undo of a partially registered save.
    fn revert_save(&self, name: &str, primary: &str, keynames: &[String], member: &str) {
        if let Err(e) = self.store.remove_from_sets(keynames, member) {
            warn!(entity = name, member, error = %e, "Failed to revert index memberships");
        }
        match self.store.delete_objects(&[primary.to_string()]) {
            Ok(_) => debug!(entity = name, key = primary, "Reverted primary record"),
            Err(e) => {
                warn!(entity = name, key = primary, error = %e, "Failed to revert primary record")
            }
        }
    }
}
