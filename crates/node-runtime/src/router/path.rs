//! Resource path parsing.
//!
//! ```text
//! /<collection>/id:<uuid>
//! /<collection>/keynames:<k1>,<k2>
//! /<collection>/set/keyname:<key>?index=<n>&amount=<n>
//! /<collection>/set/keynames:<k1>,<k2>?index=<n>&amount=<n>
//! /<collection>/
//! ```

use super::errors::{RouterError, RouterResult};
use crate::container::config::QueryConfig;
use shared_types::{parse_entity_id, EntityId, PublicKey};

/// A requester-tagged resource path. The requester's signature has
/// already been checked by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePointer {
    pub from: PublicKey,
    pub path: String,
}

impl ResourcePointer {
    pub fn new(from: PublicKey, path: impl Into<String>) -> Self {
        Self {
            from,
            path: path.into(),
        }
    }
}

/// The operation addressed inside a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ById(EntityId),
    ByKeynames(Vec<String>),
    SetByKeyname {
        keyname: String,
        index: usize,
        amount: usize,
    },
    SetByKeynames {
        keynames: Vec<String>,
        index: usize,
        amount: usize,
    },
    Collection,
}

/// A parsed resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub collection: String,
    pub route: Route,
}

impl ResourcePath {
    /// Parse `path`, applying the page size limits of `query` to set
    /// queries.
    pub fn parse(path: &str, query: &QueryConfig) -> RouterResult<Self> {
        let (location, params) = match path.split_once('?') {
            Some((location, params)) => (location, Some(params)),
            None => (path, None),
        };

        let rest = location
            .strip_prefix('/')
            .ok_or_else(|| RouterError::invalid_path(path, "must start with /"))?;
        let (collection, rest) = rest.split_once('/').unwrap_or((rest, ""));
        if collection.is_empty() {
            return Err(RouterError::invalid_path(path, "missing collection"));
        }

        let route = if rest.is_empty() {
            Route::Collection
        } else if let Some(id) = rest.strip_prefix("id:") {
            Route::ById(parse_entity_id(id).map_err(|e| RouterError::invalid_path(path, e.to_string()))?)
        } else if let Some(keys) = rest.strip_prefix("keynames:") {
            Route::ByKeynames(split_keynames(path, keys)?)
        } else if let Some(set) = rest.strip_prefix("set/") {
            let (index, amount) = parse_page(path, params, query)?;
            if let Some(keyname) = set.strip_prefix("keyname:") {
                if keyname.is_empty() {
                    return Err(RouterError::invalid_path(path, "empty keyname"));
                }
                Route::SetByKeyname {
                    keyname: keyname.to_string(),
                    index,
                    amount,
                }
            } else if let Some(keys) = set.strip_prefix("keynames:") {
                Route::SetByKeynames {
                    keynames: split_keynames(path, keys)?,
                    index,
                    amount,
                }
            } else {
                return Err(RouterError::invalid_path(path, "unknown set query"));
            }
        } else {
            return Err(RouterError::invalid_path(path, "unknown route"));
        };

        Ok(Self {
            collection: collection.to_string(),
            route,
        })
    }
}

fn split_keynames(path: &str, keys: &str) -> RouterResult<Vec<String>> {
    let keynames: Vec<String> = keys.split(',').map(str::to_string).collect();
    if keynames.iter().any(String::is_empty) {
        return Err(RouterError::invalid_path(path, "empty keyname"));
    }
    Ok(keynames)
}

fn parse_page(path: &str, params: Option<&str>, query: &QueryConfig) -> RouterResult<(usize, usize)> {
    let mut index = 0;
    let mut amount = query.default_page_size;
    for pair in params.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| RouterError::invalid_path(path, format!("malformed parameter {}", pair)))?;
        let number: usize = value
            .parse()
            .map_err(|_| RouterError::invalid_path(path, format!("{} must be a number", name)))?;
        match name {
            "index" => index = number,
            "amount" => amount = number,
            other => {
                return Err(RouterError::invalid_path(path, format!("unknown parameter {}", other)))
            }
        }
    }
    Ok((index, amount.min(query.max_page_size)))
}
