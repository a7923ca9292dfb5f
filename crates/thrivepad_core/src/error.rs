//! Error taxonomy for the session store, hooks and backend adapters.
//!
//! # Invariants
//! - Backend-level failures (`StoreError`) are mapped 1:1 onto hook-level
//!   failures (`SyncError`); nothing is swallowed on the way.
//! - `SyncError` is `Clone` so a failed listen can sit inside a watched view.

use crate::backend::DocumentId;
use thiserror::Error;

/// Authentication failures surfaced by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email address is already in use")]
    EmailAlreadyInUse,
    #[error("password is too weak")]
    WeakPassword,
    #[error("email address has not been verified")]
    EmailNotVerified,
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("auth backend unavailable: {0}")]
    Transport(String),
}

/// Failures reported by a document store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Draft/patch rejected before reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("`{0}` must not be empty")]
    EmptyField(&'static str),
}

/// Stored document could not be decoded into a typed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("document `{id}` is missing required field `{field}`")]
    MissingField { id: DocumentId, field: &'static str },
    #[error("document `{id}` has invalid field `{field}`: {message}")]
    InvalidField {
        id: DocumentId,
        field: &'static str,
        message: String,
    },
}

/// Failures surfaced by live query hooks and their mutators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no authenticated identity")]
    NotAuthenticated,
    #[error("record not found: {0}")]
    NotFound(DocumentId),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::PermissionDenied(message) => Self::PermissionDenied(message),
            StoreError::Unavailable(message) => Self::Transport(message),
            StoreError::InvalidArgument(message) => Self::InvalidArgument(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreError, SyncError};

    #[test]
    fn store_errors_map_onto_sync_errors() {
        assert_eq!(
            SyncError::from(StoreError::NotFound("g1".to_string())),
            SyncError::NotFound("g1".to_string())
        );
        assert_eq!(
            SyncError::from(StoreError::Unavailable("offline".to_string())),
            SyncError::Transport("offline".to_string())
        );
    }
}
