//! # Domain Errors
//!
//! Error types for the entity store. Every variant maps onto the shared
//! [`ErrorKind`] taxonomy through [`EntityError::kind`].

use crate::ports::StoreError;
use shared_types::{EntityId, ErrorKind};

/// Errors raised by the schema layer, the repository and the service.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("The {entity} instance (ID: {id}) was not found")]
    NotFound { entity: String, id: EntityId },

    #[error("No {entity} instance matches the keynames ({keynames})")]
    NoMatch { entity: String, keynames: String },

    #[error("Expected exactly one {entity} instance for keynames ({keynames}), found {count}")]
    AmbiguousMatch {
        entity: String,
        keynames: String,
        count: usize,
    },

    #[error("The {entity} instance (ID: {id}) already exists")]
    AlreadyExists { entity: String, id: EntityId },

    #[error("Invalid {entity}: {reason}")]
    Validation { entity: String, reason: String },

    #[error("Conflicting {entity}: {reason}")]
    Conflict { entity: String, reason: String },

    #[error("Index registration failed for {entity} (ID: {id}): {added} of {expected} keynames added, reverted")]
    IndexRegistration {
        entity: String,
        id: EntityId,
        added: usize,
        expected: usize,
    },

    #[error("Failed to decode {entity}: {message}")]
    Decode { entity: String, message: String },

    #[error("The entity type {0} is not registered")]
    UnregisteredType(String),

    #[error("The given entity is not a valid {expected} instance")]
    WrongType { expected: String },

    #[error("Invalid MetaData: {0}")]
    InvalidMetaData(String),

    #[error("Invalid partial set: index {index} + amount {amount} exceeds total amount {total}")]
    InvalidPartialSet {
        index: usize,
        amount: usize,
        total: usize,
    },

    #[error("Storage write had no effect on key {key}")]
    WriteFailed { key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EntityError {
    /// Build a validation error for `entity`.
    pub fn validation(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Build a conflict error for `entity`, for a write that lost against
    /// the current state.
    pub fn conflict(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Build a decode error for `entity` from any displayable cause.
    pub fn decode(entity: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Decode {
            entity: entity.into(),
            message: cause.to_string(),
        }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::NoMatch { .. } => ErrorKind::NotFound,
            Self::AmbiguousMatch { .. } | Self::AlreadyExists { .. } | Self::Conflict { .. } => {
                ErrorKind::Conflict
            }
            Self::Validation { .. }
            | Self::InvalidMetaData(_)
            | Self::InvalidPartialSet { .. } => ErrorKind::Validation,
            Self::IndexRegistration { .. } => ErrorKind::IndexConsistency,
            Self::Decode { .. } | Self::UnregisteredType(_) | Self::WrongType { .. } => {
                ErrorKind::Decode
            }
            Self::WriteFailed { .. } | Self::Store(_) => ErrorKind::Storage,
        }
    }

    /// True when the error is a NotFound lookup miss.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type for entity store operations.
pub type EntityResult<T> = Result<T, EntityError>;
