//! # Node Container
//!
//! Central container holding the store, the entity services, the vote
//! engine and the router, wired once at startup.

pub mod config;
pub mod node;

pub use config::{ConfigError, NodeConfig, StorageBackend};
pub use node::{build_registry, NodeContainer, NodeError};
