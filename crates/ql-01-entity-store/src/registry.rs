//! # Entity Type Registry
//!
//! A closed registry of the entity types a node can carry inside a
//! proposal. It is populated once at process start, then shared
//! immutably.
//!
//! A [`TaggedEntity`] pairs a live instance with its type name and its
//! normalized JSON value. The type name is the discriminator used on the
//! wire; decoding looks it up here instead of trying every known type.

use crate::domain::{
    validate_metadata, Entity, EntityError, EntityOf, EntityResult, MetaData, Representation,
};
use crate::service::EntityService;
use serde_json::Value;
use shared_types::EntityId;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A live entity tagged with its registered type name.
#[derive(Clone)]
pub struct TaggedEntity {
    type_name: String,
    id: EntityId,
    normalized: Value,
    instance: Arc<dyn Any + Send + Sync>,
}

impl TaggedEntity {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Normalized JSON value of the instance.
    pub fn normalized(&self) -> &Value {
        &self.normalized
    }

    /// Borrow the instance as its concrete type.
    pub fn downcast_ref<E: Entity>(&self) -> Option<&E> {
        self.instance.downcast_ref::<E>()
    }
}

impl PartialEq for TaggedEntity {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.id == other.id
            && self.normalized == other.normalized
    }
}

impl fmt::Debug for TaggedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedEntity")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("normalized", &self.normalized)
            .finish()
    }
}

/// Type-erased view of a registered representation.
trait ErasedRepresentation: Send + Sync {
    fn name(&self) -> &'static str;
    fn wrap(&self, instance: Arc<dyn Any + Send + Sync>) -> EntityResult<TaggedEntity>;
    fn decode(&self, value: Value) -> EntityResult<TaggedEntity>;
    fn save(&self, service: &EntityService, instance: &(dyn Any + Send + Sync))
        -> EntityResult<()>;
}

struct Registered<R>(R);

impl<R> ErasedRepresentation for Registered<R>
where
    R: Representation + 'static,
{
    fn name(&self) -> &'static str {
        self.0.metadata().name()
    }

    fn wrap(&self, instance: Arc<dyn Any + Send + Sync>) -> EntityResult<TaggedEntity> {
        let metadata = self.0.metadata();
        let entity = instance
            .downcast_ref::<EntityOf<R>>()
            .ok_or_else(|| EntityError::WrongType {
                expected: self.name().to_string(),
            })?;
        let id = entity.id();
        let normalized = metadata.normalize_to_value(entity)?;
        Ok(TaggedEntity {
            type_name: self.name().to_string(),
            id,
            normalized,
            instance,
        })
    }

    fn decode(&self, value: Value) -> EntityResult<TaggedEntity> {
        let entity = self.0.metadata().denormalize_from_value(value)?;
        self.wrap(Arc::new(entity))
    }

    fn save(
        &self,
        service: &EntityService,
        instance: &(dyn Any + Send + Sync),
    ) -> EntityResult<()> {
        let entity = instance
            .downcast_ref::<EntityOf<R>>()
            .ok_or_else(|| EntityError::WrongType {
                expected: self.name().to_string(),
            })?;
        service.save(entity, &self.0)
    }
}

/// Registry of proposable entity types, keyed by type name.
pub struct EntityRegistry {
    by_name: BTreeMap<String, Arc<dyn ErasedRepresentation>>,
    by_type: HashMap<TypeId, String>,
}

impl EntityRegistry {
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::default()
    }

    /// Registered type names, in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.by_name.contains_key(type_name)
    }

    fn lookup(&self, type_name: &str) -> EntityResult<&Arc<dyn ErasedRepresentation>> {
        self.by_name
            .get(type_name)
            .ok_or_else(|| EntityError::UnregisteredType(type_name.to_string()))
    }

    /// Tag a live entity with its registered type.
    pub fn wrap<E: Entity + Clone>(&self, entity: E) -> EntityResult<TaggedEntity> {
        let type_name = self
            .by_type
            .get(&TypeId::of::<E>())
            .ok_or_else(|| EntityError::UnregisteredType(std::any::type_name::<E>().to_string()))?;
        self.lookup(type_name)?.wrap(Arc::new(entity))
    }

    /// Rebuild a tagged entity from its type name and normalized value.
    pub fn decode(&self, type_name: &str, normalized: Value) -> EntityResult<TaggedEntity> {
        self.lookup(type_name)?.decode(normalized)
    }

    /// Persist a tagged entity through its registered representation.
    pub fn save(&self, service: &EntityService, entity: &TaggedEntity) -> EntityResult<()> {
        self.lookup(&entity.type_name)?
            .save(service, entity.instance.as_ref())
    }
}

/// Builder populating an [`EntityRegistry`] at process start.
#[derive(Default)]
pub struct EntityRegistryBuilder {
    by_name: BTreeMap<String, Arc<dyn ErasedRepresentation>>,
    by_type: HashMap<TypeId, String>,
}

impl EntityRegistryBuilder {
    /// Register a representation.
    ///
    /// A name shorter than [`MIN_NAME_LENGTH`](crate::domain::MIN_NAME_LENGTH)
    /// is rejected; a name registered twice keeps its first registration.
    pub fn register<R>(mut self, representation: R) -> EntityResult<Self>
    where
        R: Representation + 'static,
    {
        let metadata = representation.metadata();
        validate_metadata(metadata)?;
        let name = metadata.name();
        if self.by_name.contains_key(name) {
            warn!(entity = name, "Entity type already registered, skipping");
            return Ok(self);
        }
        debug!(entity = name, "Registered entity type");
        self.by_type
            .insert(TypeId::of::<EntityOf<R>>(), name.to_string());
        self.by_name
            .insert(name.to_string(), Arc::new(Registered(representation)));
        Ok(self)
    }

    pub fn build(self) -> EntityRegistry {
        EntityRegistry {
            by_name: self.by_name,
            by_type: self.by_type,
        }
    }
}
