//! Error types for the governance engine.

use ql_01_entity_store::EntityError;
use shared_types::{EntityId, ErrorKind};

/// Errors raised by governance entities and the vote engine.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("User {voter} already voted on request {request}")]
    DuplicateVote { request: EntityId, voter: EntityId },

    #[error("Voter wallet {voter_wallet} does not match request wallet {request_wallet}")]
    WalletMismatch {
        voter_wallet: EntityId,
        request_wallet: EntityId,
    },

    #[error("Request {request} is already resolved")]
    RequestResolved { request: EntityId },

    #[error("The vote carries a copy of request {request} that differs from the stored one")]
    RequestMismatch { request: EntityId },
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Entity(e) => e.kind(),
            Self::DuplicateVote { .. } | Self::RequestResolved { .. } => ErrorKind::Conflict,
            Self::WalletMismatch { .. } | Self::RequestMismatch { .. } => ErrorKind::Validation,
        }
    }
}

/// Result type for governance operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;
