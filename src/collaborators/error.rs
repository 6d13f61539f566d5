//! Collaborator error types

use thiserror::Error;
use uuid::Uuid;

/// Errors from persistence, authentication and blob storage backends
///
/// Returned to callers unchanged; nothing in this crate retries them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollaboratorError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;
