//! Entity store errors

use thiserror::Error;

use crate::maintenance::WriteRejected;
use crate::storage::StoreError;

use super::kind::EntityKind;

pub type EntityResult<T> = Result<T, EntityError>;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error(transparent)]
    WriteRejected(#[from] WriteRejected),

    #[error("invalid entity: {0}")]
    Invalid(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: EntityKind, id: String },

    /// A reference points at an entity that does not exist
    #[error("referenced {kind} '{id}' does not exist")]
    DanglingReference { kind: EntityKind, id: String },

    /// A stored record could not be decoded or disagrees with its key
    #[error("corrupt entity record at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl EntityError {
    pub fn code(&self) -> &'static str {
        match self {
            EntityError::WriteRejected(e) => e.code(),
            EntityError::Invalid(_) => "CS_ENTITY_INVALID",
            EntityError::NotFound { .. } => "CS_ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "CS_ENTITY_EXISTS",
            EntityError::DanglingReference { .. } => "CS_DANGLING_REFERENCE",
            EntityError::Corrupt { .. } => "CS_ENTITY_CORRUPT",
            EntityError::Store(_) => "CS_STORE_UNAVAILABLE",
        }
    }
}
