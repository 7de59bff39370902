//! # Core Identifiers
//!
//! Identifier and key types shared by every entity type.
//!
//! - **Entities**: [`EntityId`] (128-bit UUID)
//! - **Identity**: [`PublicKey`] of a requester, wallet creator or voter
//! - **Integrity**: [`Hash`] of the replicated store state

/// The 128-bit unique identifier of any entity.
///
/// Ids are supplied by the caller; nothing inside a state transition
/// generates one.
pub type EntityId = uuid::Uuid;

/// A 32-byte hash (SHA3-256).
pub type Hash = [u8; 32];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Lower-case hex rendering of a public key, as used inside index keynames.
pub fn public_key_hex(key: &PublicKey) -> String {
    hex::encode(key)
}

/// Parse a 64-character hex string into a public key.
pub fn parse_public_key(value: &str) -> Result<PublicKey, KeyParseError> {
    let bytes = hex::decode(value).map_err(|e| KeyParseError::InvalidHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyParseError::InvalidLength(bytes.len()))
}

/// Parse an entity id from its canonical hyphenated form.
pub fn parse_entity_id(value: &str) -> Result<EntityId, KeyParseError> {
    uuid::Uuid::parse_str(value).map_err(|e| KeyParseError::InvalidId(e.to_string()))
}

/// Errors raised while parsing identifiers from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid public key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid entity id: {0}")]
    InvalidId(String),
}
