//! Per-collection controllers.
//!
//! A controller answers every route of one collection and returns
//! normalized JSON. [`RepresentationController`] covers any type through its
//! representation; [`VoteController`] routes saves through the vote engine.

use super::errors::{RouterError, RouterResult};
use ql_01_entity_store::{
    EntityOf, EntityService, MetaData, PartialSet, Representation,
};
use ql_02_governance::{Vote, VoteService, VoteSchema};
use serde_json::Value;
use shared_types::{public_key_hex, EntityId, PublicKey};
use std::sync::Arc;
use tracing::info;

/// Every route of one collection.
pub trait EntityController: Send + Sync {
    /// Collection keyname the controller is mounted under.
    fn keyname(&self) -> String;

    fn retrieve_by_id(&self, id: &EntityId) -> RouterResult<Value>;

    fn retrieve_by_keynames(&self, keynames: &[String]) -> RouterResult<Value>;

    fn retrieve_set_by_keyname(&self, keyname: &str, index: usize, amount: usize)
        -> RouterResult<Value>;

    fn retrieve_set_by_keynames(
        &self,
        keynames: &[String],
        index: usize,
        amount: usize,
    ) -> RouterResult<Value>;

    /// Decode `payload` in the normalized wire format and save it.
    fn save(&self, from: &PublicKey, payload: &[u8]) -> RouterResult<Value>;

    fn delete(&self, from: &PublicKey, id: &EntityId) -> RouterResult<Value>;
}

/// Public key that must match the requester to save an entity.
pub type OwnerFn<R> = fn(&EntityOf<R>) -> PublicKey;

fn normalize_set<M: MetaData>(metadata: &M, set: &PartialSet<M::Entity>) -> RouterResult<Value> {
    Ok(serde_json::to_value(set.normalize(metadata)?)?)
}

fn check_owner(entity: &str, expected: &PublicKey, from: &PublicKey) -> RouterResult<()> {
    if expected != from {
        return Err(RouterError::Unauthorized {
            entity: entity.to_string(),
            requester: public_key_hex(from),
        });
    }
    Ok(())
}

/// Controller backed by a [`Representation`] and the entity service.
pub struct RepresentationController<R: Representation> {
    representation: R,
    service: EntityService,
    owner: Option<OwnerFn<R>>,
}

impl<R: Representation> RepresentationController<R> {
    pub fn new(representation: R, service: EntityService) -> Self {
        Self {
            representation,
            service,
            owner: None,
        }
    }

    /// Require the requester to be the entity's owner on save and delete.
    /// Without an owner the collection accepts no deletes.
    pub fn with_owner(mut self, owner: OwnerFn<R>) -> Self {
        self.owner = Some(owner);
        self
    }

    fn metadata(&self) -> &R::MetaData {
        self.representation.metadata()
    }
}

impl<R: Representation> EntityController for RepresentationController<R> {
    fn keyname(&self) -> String {
        self.metadata().keyname()
    }

    fn retrieve_by_id(&self, id: &EntityId) -> RouterResult<Value> {
        let entity = self.service.repository().retrieve_by_id(self.metadata(), id)?;
        Ok(self.metadata().normalize_to_value(&entity)?)
    }

    fn retrieve_by_keynames(&self, keynames: &[String]) -> RouterResult<Value> {
        let entity = self
            .service
            .repository()
            .retrieve_by_intersect_keynames(self.metadata(), keynames)?;
        Ok(self.metadata().normalize_to_value(&entity)?)
    }

    fn retrieve_set_by_keyname(
        &self,
        keyname: &str,
        index: usize,
        amount: usize,
    ) -> RouterResult<Value> {
        let set = self
            .service
            .repository()
            .retrieve_set_by_keyname(self.metadata(), keyname, index, amount)?;
        normalize_set(self.metadata(), &set)
    }

    fn retrieve_set_by_keynames(
        &self,
        keynames: &[String],
        index: usize,
        amount: usize,
    ) -> RouterResult<Value> {
        let set = self.service.repository().retrieve_set_by_intersect_keynames(
            self.metadata(),
            keynames,
            index,
            amount,
        )?;
        normalize_set(self.metadata(), &set)
    }

    fn save(&self, from: &PublicKey, payload: &[u8]) -> RouterResult<Value> {
        let metadata = self.metadata();
        let entity = metadata.decode(payload)?;
        if let Some(owner) = self.owner {
            check_owner(metadata.name(), &owner(&entity), from)?;
        }
        self.service.save(&entity, &self.representation)?;
        Ok(metadata.normalize_to_value(&entity)?)
    }

    fn delete(&self, from: &PublicKey, id: &EntityId) -> RouterResult<Value> {
        let metadata = self.metadata();
        let owner = self.owner.ok_or_else(|| {
            RouterError::UnsupportedOperation(format!("/{}/id:{} (no owner)", self.keyname(), id))
        })?;
        let entity = self.service.repository().retrieve_by_id(metadata, id)?;
        check_owner(metadata.name(), &owner(&entity), from)?;
        self.service.delete(&entity, &self.representation)?;
        info!(entity = metadata.name(), %id, requester = %public_key_hex(from), "Deleted through router");
        Ok(Value::Null)
    }
}

/// Controller of the vote collection. Saves go through the vote engine,
/// and only the voter may submit a vote.
pub struct VoteController {
    votes: Arc<VoteService>,
    inner: RepresentationController<VoteSchema>,
}

impl VoteController {
    pub fn new(votes: Arc<VoteService>, service: EntityService) -> Self {
        let inner = RepresentationController::new(votes.votes().clone(), service);
        Self { votes, inner }
    }
}

impl EntityController for VoteController {
    fn keyname(&self) -> String {
        self.inner.keyname()
    }

    fn retrieve_by_id(&self, id: &EntityId) -> RouterResult<Value> {
        self.inner.retrieve_by_id(id)
    }

    fn retrieve_by_keynames(&self, keynames: &[String]) -> RouterResult<Value> {
        self.inner.retrieve_by_keynames(keynames)
    }

    fn retrieve_set_by_keyname(
        &self,
        keyname: &str,
        index: usize,
        amount: usize,
    ) -> RouterResult<Value> {
        self.inner.retrieve_set_by_keyname(keyname, index, amount)
    }

    fn retrieve_set_by_keynames(
        &self,
        keynames: &[String],
        index: usize,
        amount: usize,
    ) -> RouterResult<Value> {
        self.inner.retrieve_set_by_keynames(keynames, index, amount)
    }

    fn save(&self, from: &PublicKey, payload: &[u8]) -> RouterResult<Value> {
        let schema = self.votes.votes();
        let vote: Vote = schema.decode(payload)?;
        check_owner(schema.name(), &vote.voter().public_key, from)?;
        let outcome = self.votes.save(&vote)?;
        Ok(serde_json::to_value(outcome)?)
    }

    fn delete(&self, _: &PublicKey, _: &EntityId) -> RouterResult<Value> {
        Err(RouterError::UnsupportedOperation(format!(
            "/{}/id:<uuid> (votes are purged by the engine)",
            self.keyname()
        )))
    }
}
