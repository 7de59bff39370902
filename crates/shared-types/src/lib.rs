//! # Shared Types Crate
//!
//! Identifiers, key types and the error taxonomy used across the entity
//! store, the governance engine and the node runtime.
//!
//! ## Design Principles
//!
//! - **Caller-supplied identity**: entity ids are plain UUIDs chosen by the
//!   caller before a transaction enters the deterministic path.
//! - **One error taxonomy**: every crate maps its errors onto [`ErrorKind`],
//!   which the router turns into a numeric response code.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
