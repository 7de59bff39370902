//! # Schema Layer
//!
//! Per-type descriptors driving the generic repository and service.
//!
//! - [`MetaData`]: identity and codec of a type (name, collection keyname,
//!   storable and normalized forms, reconstruction of live entities).
//! - [`Representation`]: persistence of a type (storable record, index
//!   keynames, pre-save sync hook, pre-delete guard).
//!
//! The storable record references nested entities by id and is encoded with
//! `bincode`; the normalized value inlines nested entities and is encoded as
//! JSON, the wire format accepted by [`MetaData::to_entity`].

use crate::domain::{EntityError, EntityResult};
use crate::repository::EntityRepository;
use crate::service::EntityService;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::EntityId;

/// Minimum length of a type name.
pub const MIN_NAME_LENGTH: usize = 3;

/// Anything identified by a 128-bit unique identifier.
pub trait Entity: Send + Sync + 'static {
    fn id(&self) -> EntityId;
}

/// Input accepted by [`MetaData::to_entity`].
pub enum EntityData<'a, S> {
    /// A record read back from the store.
    Storable(S),
    /// Raw bytes in the normalized wire format.
    Encoded(&'a [u8]),
}

/// Identity and codec descriptor of an entity type.
///
/// ## Round-trip
///
/// `denormalize(normalize(e))` must be observably equal to `e`, and so must
/// `from_storable(to_storable(e))` given a repository that resolves every
/// nested reference.
pub trait MetaData: Send + Sync {
    type Entity: Entity + Clone;
    type Storable: Serialize + DeserializeOwned;
    type Normalized: Serialize + DeserializeOwned;

    /// Human-readable type name (at least [`MIN_NAME_LENGTH`] characters).
    fn name(&self) -> &'static str;

    /// Collection keyname, the lower-cased type name.
    fn keyname(&self) -> String {
        self.name().to_lowercase()
    }

    /// Rebuild a live entity from its storable record, resolving nested
    /// references through `repository`.
    fn from_storable(
        &self,
        repository: &EntityRepository,
        storable: Self::Storable,
    ) -> EntityResult<Self::Entity>;

    /// Convert a live entity into its self-contained normalized value.
    fn normalize(&self, entity: &Self::Entity) -> EntityResult<Self::Normalized>;

    /// Rebuild a live entity from its normalized value.
    fn denormalize(&self, normalized: Self::Normalized) -> EntityResult<Self::Entity>;

    /// Rebuild a live entity from either a record or encoded bytes.
    fn to_entity(
        &self,
        repository: &EntityRepository,
        data: EntityData<'_, Self::Storable>,
    ) -> EntityResult<Self::Entity> {
        match data {
            EntityData::Storable(storable) => self.from_storable(repository, storable),
            EntityData::Encoded(bytes) => self.decode(bytes),
        }
    }

    /// Normalize then encode to wire bytes.
    fn encode(&self, entity: &Self::Entity) -> EntityResult<Vec<u8>> {
        let normalized = self.normalize(entity)?;
        serde_json::to_vec(&normalized).map_err(|e| EntityError::decode(self.name(), e))
    }

    /// Decode wire bytes then denormalize.
    fn decode(&self, bytes: &[u8]) -> EntityResult<Self::Entity> {
        let normalized: Self::Normalized =
            serde_json::from_slice(bytes).map_err(|e| EntityError::decode(self.name(), e))?;
        self.denormalize(normalized)
    }

    /// Normalize to a JSON value, used when embedding entities in other
    /// normalized values.
    fn normalize_to_value(&self, entity: &Self::Entity) -> EntityResult<serde_json::Value> {
        let normalized = self.normalize(entity)?;
        serde_json::to_value(normalized).map_err(|e| EntityError::decode(self.name(), e))
    }

    /// Denormalize from a JSON value.
    fn denormalize_from_value(&self, value: serde_json::Value) -> EntityResult<Self::Entity> {
        let normalized: Self::Normalized =
            serde_json::from_value(value).map_err(|e| EntityError::decode(self.name(), e))?;
        self.denormalize(normalized)
    }

    /// Encode a storable record for the store.
    fn encode_storable(&self, storable: &Self::Storable) -> EntityResult<Vec<u8>> {
        bincode::serialize(storable).map_err(|e| EntityError::decode(self.name(), e))
    }

    /// Decode a storable record read from the store.
    fn decode_storable(&self, record: &[u8]) -> EntityResult<Self::Storable> {
        bincode::deserialize(record).map_err(|e| EntityError::decode(self.name(), e))
    }
}

/// Persistence descriptor of a mutable entity type.
pub trait Representation: Send + Sync {
    type MetaData: MetaData;

    fn metadata(&self) -> &Self::MetaData;

    /// Produce the durable record; nested entities are referenced by id.
    fn to_storable(
        &self,
        entity: &<Self::MetaData as MetaData>::Entity,
    ) -> EntityResult<<Self::MetaData as MetaData>::Storable>;

    /// Every secondary-index key the entity is registered under.
    ///
    /// Must be deterministic: Save and Delete both rely on it.
    fn keynames(
        &self,
        _entity: &<Self::MetaData as MetaData>::Entity,
    ) -> EntityResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Hook run before persistence. May cascade-save dependent entities or
    /// reject the save.
    fn sync(
        &self,
        _service: &EntityService,
        _entity: &<Self::MetaData as MetaData>::Entity,
    ) -> EntityResult<()> {
        Ok(())
    }

    /// Hook run before removal, once the entity is known to exist. May
    /// reject the delete while other entities still reference it.
    fn before_delete(
        &self,
        _service: &EntityService,
        _entity: &<Self::MetaData as MetaData>::Entity,
    ) -> EntityResult<()> {
        Ok(())
    }
}

/// Live entity type of a representation.
pub type EntityOf<R> = <<R as Representation>::MetaData as MetaData>::Entity;

/// Storable record type of a representation.
pub type StorableOf<R> = <<R as Representation>::MetaData as MetaData>::Storable;

/// Normalized value type of a representation.
pub type NormalizedOf<R> = <<R as Representation>::MetaData as MetaData>::Normalized;

/// Check the structural requirements of a MetaData descriptor.
pub fn validate_metadata<M: MetaData + ?Sized>(metadata: &M) -> EntityResult<()> {
    let name = metadata.name();
    if name.len() < MIN_NAME_LENGTH {
        return Err(EntityError::InvalidMetaData(format!(
            "the minimum length for the name is {} characters: {} given ({})",
            MIN_NAME_LENGTH,
            name.len(),
            name
        )));
    }
    Ok(())
}
