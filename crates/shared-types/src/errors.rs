//! # Error Taxonomy
//!
//! Every failure surfaced by the entity store, the governance engine or the
//! router belongs to exactly one [`ErrorKind`]. None of them is retried
//! internally; the state-transition driver turns them into a rejected
//! response carrying [`ErrorKind::code`].

use serde::{Deserialize, Serialize};

/// Classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An id or intersection lookup matched zero records.
    NotFound,
    /// Save on an existing id, duplicate vote, resolved request.
    Conflict,
    /// A Sync hook or domain invariant rejected the operation.
    Validation,
    /// Index membership could not be applied consistently.
    IndexConsistency,
    /// Malformed bytes or an unregistered type tag.
    Decode,
    /// The storage adapter failed.
    Storage,
    /// The resource path or collection is unknown.
    Routing,
}

impl ErrorKind {
    /// Numeric status code reported in rejected responses (0 is success).
    pub fn code(self) -> u32 {
        match self {
            Self::NotFound => 1,
            Self::Conflict => 2,
            Self::Validation => 3,
            Self::IndexConsistency => 4,
            Self::Decode => 5,
            Self::Storage => 6,
            Self::Routing => 7,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::IndexConsistency => "index consistency",
            Self::Decode => "decode",
            Self::Storage => "storage",
            Self::Routing => "routing",
        };
        f.write_str(name)
    }
}
