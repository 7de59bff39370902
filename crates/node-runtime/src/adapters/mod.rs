//! # Adapters
//!
//! Host-side implementations of the entity store's outbound ports.

pub mod storage;
