//! # Transaction and Query Router
//!
//! Deterministic entry point the replication engine calls for every query
//! and every ordered transaction.
//!
//! | Path | Query | Transaction |
//! |------|-------|-------------|
//! | `/<keyname>/id:<uuid>` | retrieve by id | delete |
//! | `/<keyname>/keynames:<k1>,<k2>` | retrieve by intersection | - |
//! | `/<keyname>/set/keyname:<key>` | page of an index | - |
//! | `/<keyname>/set/keynames:<k1>,<k2>` | page of an intersection | - |
//! | `/<keyname>/` | - | save the payload |
//!
//! Failures never panic: they become a [`Response`] whose `code` is the
//! error kind's code and whose `log` is the error message.

pub mod controllers;
pub mod errors;
pub mod path;

pub use controllers::{EntityController, RepresentationController, VoteController};
pub use errors::{RouterError, RouterResult};
pub use path::{ResourcePath, ResourcePointer, Route};

use crate::container::config::QueryConfig;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a routed query or transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// 0 on success, otherwise the error kind's code.
    pub code: u32,
    /// Human-readable outcome.
    pub log: String,
    /// Normalized JSON of the result.
    pub value: Value,
}

impl Response {
    pub fn ok(value: Value) -> Self {
        Self {
            code: 0,
            log: "ok".to_string(),
            value,
        }
    }

    pub fn from_error(error: &RouterError) -> Self {
        Self {
            code: error.kind().code(),
            log: error.to_string(),
            value: Value::Null,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Dispatches resource paths to the controller of their collection.
pub struct Router {
    controllers: BTreeMap<String, Arc<dyn EntityController>>,
    query: QueryConfig,
}

impl Router {
    pub fn new(query: QueryConfig) -> Self {
        Self {
            controllers: BTreeMap::new(),
            query,
        }
    }

    /// Mount a controller under its collection keyname.
    pub fn mount(mut self, controller: Arc<dyn EntityController>) -> Self {
        let keyname = controller.keyname();
        if self.controllers.contains_key(&keyname) {
            warn!(keyname = %keyname, "Collection already mounted, skipping");
            return self;
        }
        self.controllers.insert(keyname, controller);
        self
    }

    /// Mounted collection keynames, in ascending order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    /// Answer a read-only query.
    pub fn query(&self, pointer: &ResourcePointer) -> Response {
        Self::respond(&pointer.path, self.try_query(pointer))
    }

    /// Apply a transaction.
    pub fn transact(&self, pointer: &ResourcePointer, payload: &[u8]) -> Response {
        Self::respond(&pointer.path, self.try_transact(pointer, payload))
    }

    fn respond(path: &str, result: RouterResult<Value>) -> Response {
        match result {
            Ok(value) => Response::ok(value),
            Err(e) => {
                debug!(path, code = e.kind().code(), error = %e, "Rejected");
                Response::from_error(&e)
            }
        }
    }

    fn resolve(&self, path: &str) -> RouterResult<(ResourcePath, &Arc<dyn EntityController>)> {
        let parsed = ResourcePath::parse(path, &self.query)?;
        let controller = self
            .controllers
            .get(&parsed.collection)
            .ok_or_else(|| RouterError::UnknownCollection(parsed.collection.clone()))?;
        Ok((parsed, controller))
    }

    fn try_query(&self, pointer: &ResourcePointer) -> RouterResult<Value> {
        let (parsed, controller) = self.resolve(&pointer.path)?;
        match parsed.route {
            Route::ById(id) => controller.retrieve_by_id(&id),
            Route::ByKeynames(keynames) => controller.retrieve_by_keynames(&keynames),
            Route::SetByKeyname {
                keyname,
                index,
                amount,
            } => controller.retrieve_set_by_keyname(&keyname, index, amount),
            Route::SetByKeynames {
                keynames,
                index,
                amount,
            } => controller.retrieve_set_by_keynames(&keynames, index, amount),
            Route::Collection => Err(RouterError::UnsupportedOperation(pointer.path.clone())),
        }
    }

    fn try_transact(&self, pointer: &ResourcePointer, payload: &[u8]) -> RouterResult<Value> {
        let (parsed, controller) = self.resolve(&pointer.path)?;
        match parsed.route {
            Route::Collection => controller.save(&pointer.from, payload),
            Route::ById(id) => controller.delete(&pointer.from, &id),
            _ => Err(RouterError::UnsupportedOperation(pointer.path.clone())),
        }
    }
}
