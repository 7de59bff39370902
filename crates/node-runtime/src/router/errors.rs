use ql_01_entity_store::EntityError;
use ql_02_governance::GovernanceError;
use shared_types::ErrorKind;

/// Errors raised while routing a query or a transaction.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid resource path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("The path {0} does not accept this operation")]
    UnsupportedOperation(String),

    #[error("The requester {requester} is not allowed to submit this {entity}")]
    Unauthorized { entity: String, requester: String },

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RouterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCollection(_)
            | Self::InvalidPath { .. }
            | Self::UnsupportedOperation(_) => ErrorKind::Routing,
            Self::Unauthorized { .. } => ErrorKind::Validation,
            Self::Entity(e) => e.kind(),
            Self::Governance(e) => e.kind(),
            Self::Encode(_) => ErrorKind::Decode,
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type RouterResult<T> = Result<T, RouterError>;
