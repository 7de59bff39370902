//! # Domain Layer
//!
//! Schema traits, paginated results, keyname conventions and errors of the
//! entity store.
//!
//! This module contains NO I/O. Records reach the store only through the
//! `EntityService` and are read back only through the `EntityRepository`.

pub mod errors;
pub mod keynames;
pub mod partial_set;
pub mod schema;

pub use errors::*;
pub use keynames::*;
pub use partial_set::*;
pub use schema::*;
