use super::config::{ConfigError, NodeConfig, StorageBackend};
use crate::router::{RepresentationController, Router, VoteController};
use ql_01_entity_store::{
    EntityRegistry, EntityResult, EntityService, EntityStore, InMemoryEntityStore,
};
use ql_02_governance::{Request, User, UserSchema, VoteService, Wallet, WalletSchema};
use std::sync::Arc;
use tracing::info;

/// Registry of the entity types a request may propose.
pub fn build_registry() -> EntityResult<EntityRegistry> {
    Ok(EntityRegistry::builder()
        .register(WalletSchema)?
        .register(UserSchema)?
        .build())
}

/// All runtime components of a node.
pub struct NodeContainer {
    pub config: NodeConfig,
    store: Arc<dyn EntityStore>,
    service: EntityService,
    votes: Arc<VoteService>,
    router: Arc<Router>,
}

impl NodeContainer {
    /// Open the configured storage backend and wire every component on it.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let store = open_store(&config)?;
        Self::with_store(config, store)
    }

    /// Wire every component on an already opened store.
    pub fn with_store(config: NodeConfig, store: Arc<dyn EntityStore>) -> Result<Self, NodeError> {
        let registry = Arc::new(build_registry()?);
        let service = EntityService::new(store.clone());
        let votes = Arc::new(VoteService::new(service.clone(), registry));

        let router = Router::new(config.query.clone())
            .mount(Arc::new(
                RepresentationController::new(WalletSchema, service.clone())
                    .with_owner(|wallet: &Wallet| wallet.creator),
            ))
            .mount(Arc::new(
                RepresentationController::new(UserSchema, service.clone())
                    .with_owner(|user: &User| user.wallet.creator),
            ))
            .mount(Arc::new(
                RepresentationController::new(votes.requests().clone(), service.clone())
                    .with_owner(|request: &Request| request.from.public_key),
            ))
            .mount(Arc::new(VoteController::new(votes.clone(), service.clone())));

        info!(
            backend = %config.storage.backend,
            collections = ?router.collections().collect::<Vec<_>>(),
            "Node container initialized"
        );

        Ok(Self {
            config,
            store,
            service,
            votes,
            router: Arc::new(router),
        })
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn service(&self) -> &EntityService {
        &self.service
    }

    pub fn votes(&self) -> &Arc<VoteService> {
        &self.votes
    }

    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }
}

/// Errors raised while building the node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Entity(#[from] ql_01_entity_store::EntityError),

    #[error(transparent)]
    Store(#[from] ql_01_entity_store::StoreError),
}

fn open_store(config: &NodeConfig) -> Result<Arc<dyn EntityStore>, NodeError> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryEntityStore::new())),
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb => {
            use crate::adapters::storage::{RocksDbConfig, RocksDbStore};
            use ql_01_entity_store::KvEntityStore;

            let path = config.storage.data_dir.join("entities");
            let db = RocksDbStore::open(RocksDbConfig {
                path: path.to_string_lossy().to_string(),
                ..Default::default()
            })?;
            Ok(Arc::new(KvEntityStore::new(db)))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb => {
            Err(ConfigError::BackendUnavailable(StorageBackend::RocksDb).into())
        }
    }
}
