//! # Ports Layer (Hexagonal Architecture)
//!
//! - `outbound`: the storage capabilities the entity store requires from
//!   its host (object store, ordered sets, key/value backend)

pub mod outbound;

pub use outbound::*;
