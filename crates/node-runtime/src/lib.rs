//! # Node Runtime Library
//!
//! Wires the entity store and the governance engine into a node: storage
//! backend selection, the deterministic transaction/query router and the
//! polling daemon. The main entry point is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `container/` - configuration and component wiring
//! - `router/` - resource paths, per-collection controllers, responses
//! - `daemon` - polling loops submitting transactions
//! - `adapters/` - production storage (RocksDB, feature `rocksdb`)

pub mod adapters;
pub mod container;
pub mod daemon;
pub mod router;

pub use container::{NodeConfig, NodeContainer};
pub use daemon::{Daemon, DaemonStats, Job, JobReport, StopHandle, TransactionFeed};
pub use router::{ResourcePointer, Response, Router, RouterError};
