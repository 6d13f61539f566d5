//! External collaborator interfaces
//!
//! Persistence, authentication and blob storage live outside this crate.
//! The viewer only needs these narrow contracts.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::sync::FieldValueMap;

use super::error::Result;
use super::types::{AuthUser, BlobMetadata, CharacterRecord};

/// Character record persistence
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record, or update `record_id` when given
    async fn save(&self, values: FieldValueMap, record_id: Option<Uuid>)
        -> Result<CharacterRecord>;

    async fn load(&self, record_id: Uuid) -> Result<FieldValueMap>;

    async fn delete(&self, record_id: Uuid) -> Result<()>;
}

/// Session authentication
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;

    /// Notified whenever the signed-in user changes
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Blob storage holding blank sheets and coordinate datasets
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMetadata>>;

    /// Public URL for `path`
    async fn get_url(&self, path: &str) -> Result<String>;

    /// Time-limited URL for `path`
    async fn get_signed_url(&self, path: &str, ttl: Duration) -> Result<String>;
}
