//! Requests: proposed entities awaiting weighted approval.
//!
//! The proposed entity is stored as its registered type name plus its
//! normalized JSON, and rebuilt through the [`EntityRegistry`] on read.

use super::user::{NormalizedUser, User, UserSchema};
use ql_01_entity_store::{
    Entity, EntityError, EntityRegistry, EntityRepository, EntityResult, EntityService, MetaData,
    Representation, TaggedEntity,
};
use serde::{Deserialize, Serialize};
use shared_types::EntityId;
use std::sync::Arc;

/// Collection of every pending request.
pub const REQUESTS: &str = "requests";

/// Index of the requests proposed by a user.
pub fn keyname_by_from_user(user_id: &EntityId) -> String {
    format!("{}:by_from_id:{}", REQUESTS, user_id)
}

/// Index of the requests pending in a wallet.
pub fn keyname_by_wallet(wallet_id: &EntityId) -> String {
    format!("{}:by_wallet_id:{}", REQUESTS, wallet_id)
}

/// A proposal to create `new_entity` once the wallet approves it.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: EntityId,
    pub from: User,
    pub new_entity: TaggedEntity,
}

impl Request {
    /// Id of the wallet the request is pending in.
    pub fn wallet_id(&self) -> EntityId {
        self.from.wallet.id
    }

    /// Shares needed to resolve the request either way.
    pub fn consensus_needed(&self) -> u64 {
        self.from.wallet.consensus_needed
    }
}

impl Entity for Request {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Durable record of a [`Request`].
///
/// The payload is kept as a JSON string so that the record itself stays
/// bincode-encodable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: EntityId,
    pub from_user_id: EntityId,
    pub entity_type: String,
    pub entity_json: String,
}

/// Wire form of a proposed entity: type tag plus normalized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPayload {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: serde_json::Value,
}

/// Wire form of a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRequest {
    pub id: EntityId,
    pub from: NormalizedUser,
    pub new_entity: NormalizedPayload,
}

/// Schema of [`Request`], bound to the registry of proposable types.
#[derive(Clone)]
pub struct RequestSchema {
    registry: Arc<EntityRegistry>,
}

impl RequestSchema {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }
}

impl MetaData for RequestSchema {
    type Entity = Request;
    type Storable = RequestRecord;
    type Normalized = NormalizedRequest;

    fn name(&self) -> &'static str {
        "Request"
    }

    fn from_storable(
        &self,
        repository: &EntityRepository,
        record: RequestRecord,
    ) -> EntityResult<Request> {
        let from = repository.retrieve_by_id(&UserSchema, &record.from_user_id)?;
        let value = serde_json::from_str(&record.entity_json)
            .map_err(|e| EntityError::decode(self.name(), e))?;
        let new_entity = self.registry.decode(&record.entity_type, value)?;
        Ok(Request {
            id: record.id,
            from,
            new_entity,
        })
    }

    fn normalize(&self, request: &Request) -> EntityResult<NormalizedRequest> {
        Ok(NormalizedRequest {
            id: request.id,
            from: UserSchema.normalize(&request.from)?,
            new_entity: NormalizedPayload {
                type_name: request.new_entity.type_name().to_string(),
                value: request.new_entity.normalized().clone(),
            },
        })
    }

    fn denormalize(&self, normalized: NormalizedRequest) -> EntityResult<Request> {
        Ok(Request {
            id: normalized.id,
            from: UserSchema.denormalize(normalized.from)?,
            new_entity: self
                .registry
                .decode(&normalized.new_entity.type_name, normalized.new_entity.value)?,
        })
    }
}

impl Representation for RequestSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, request: &Request) -> EntityResult<RequestRecord> {
        let entity_json = serde_json::to_string(request.new_entity.normalized())
            .map_err(|e| EntityError::decode(self.name(), e))?;
        Ok(RequestRecord {
            id: request.id,
            from_user_id: request.from.id,
            entity_type: request.new_entity.type_name().to_string(),
            entity_json,
        })
    }

    fn keynames(&self, request: &Request) -> EntityResult<Vec<String>> {
        Ok(vec![
            REQUESTS.to_string(),
            keyname_by_from_user(&request.from.id),
            keyname_by_wallet(&request.wallet_id()),
        ])
    }

    fn sync(&self, service: &EntityService, request: &Request) -> EntityResult<()> {
        if !self.registry.contains(request.new_entity.type_name()) {
            return Err(EntityError::UnregisteredType(
                request.new_entity.type_name().to_string(),
            ));
        }
        if !service.repository().exists(&UserSchema, &request.from.id)? {
            return Err(EntityError::validation(
                self.name(),
                format!("the proposing user {} does not exist", request.from.id),
            ));
        }
        let from = service.repository().retrieve_by_id(&UserSchema, &request.from.id)?;
        if from != request.from {
            return Err(EntityError::validation(
                self.name(),
                format!("the proposing user {} differs from the stored one", from.id),
            ));
        }
        Ok(())
    }

    /// A request with votes is only removed by the vote engine's purge,
    /// which deletes the votes first.
    fn before_delete(&self, service: &EntityService, request: &Request) -> EntityResult<()> {
        let votes = service
            .store()
            .set_len(&super::vote::keyname_by_request(&request.id))?;
        if votes > 0 {
            return Err(EntityError::conflict(
                self.name(),
                format!("request {} already has {} votes", request.id, votes),
            ));
        }
        Ok(())
    }
}
