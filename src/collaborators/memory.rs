//! In-memory collaborators for tests and the CLI

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::sync::FieldValueMap;

use super::error::{CollaboratorError, Result};
use super::traits::{AuthProvider, BlobStore, RecordStore};
use super::types::{AuthUser, BlobMetadata, CharacterRecord};

/// Record store backed by a map
///
/// Records are stamped with the signed-in user when an auth provider is
/// attached.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<Uuid, CharacterRecord>>,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            auth: Some(auth),
        }
    }

    pub async fn get(&self, record_id: Uuid) -> Option<CharacterRecord> {
        self.records.read().await.get(&record_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(
        &self,
        values: FieldValueMap,
        record_id: Option<Uuid>,
    ) -> Result<CharacterRecord> {
        let mut records = self.records.write().await;
        let record = match record_id {
            Some(id) => {
                let record = records
                    .get_mut(&id)
                    .ok_or(CollaboratorError::NotFound(id))?;
                record.values = values;
                record.updated_at = Utc::now();
                record.clone()
            }
            None => {
                let owner = self
                    .auth
                    .as_ref()
                    .and_then(|a| a.current_user())
                    .map(|u| u.id);
                let record = CharacterRecord::new(values, owner);
                records.insert(record.id, record.clone());
                record
            }
        };

        tracing::debug!(record_id = %record.id, fields = record.values.len(), "Saved character record");
        Ok(record)
    }

    async fn load(&self, record_id: Uuid) -> Result<FieldValueMap> {
        self.records
            .read()
            .await
            .get(&record_id)
            .map(|r| r.values.clone())
            .ok_or(CollaboratorError::NotFound(record_id))
    }

    async fn delete(&self, record_id: Uuid) -> Result<()> {
        self.records
            .write()
            .await
            .remove(&record_id)
            .map(|_| ())
            .ok_or(CollaboratorError::NotFound(record_id))
    }
}

/// Auth provider whose user is set by hand
pub struct StaticAuth {
    user: watch::Sender<Option<AuthUser>>,
}

impl StaticAuth {
    pub fn signed_out() -> Self {
        let (user, _) = watch::channel(None);
        Self { user }
    }

    pub fn signed_in(user: AuthUser) -> Self {
        let (user, _) = watch::channel(Some(user));
        Self { user }
    }

    pub fn sign_in(&self, user: AuthUser) {
        self.user.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        self.user.send_replace(None);
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.user.subscribe()
    }
}

/// Blob store over an in-memory object map
pub struct MemoryBlobStore {
    base_url: String,
    objects: RwLock<BTreeMap<String, BlobMetadata>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn put(&self, path: &str, size: u64, content_type: Option<&str>) {
        let metadata = BlobMetadata {
            path: path.to_string(),
            size,
            content_type: content_type.map(str::to_string),
            last_modified: Some(Utc::now()),
        };
        self.objects.write().await.insert(path.to_string(), metadata);
    }

    async fn require(&self, path: &str) -> Result<()> {
        if self.objects.read().await.contains_key(path) {
            Ok(())
        } else {
            Err(CollaboratorError::BlobNotFound(path.to_string()))
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMetadata>> {
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(_, meta)| meta.clone())
            .collect())
    }

    async fn get_url(&self, path: &str) -> Result<String> {
        self.require(path).await?;
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn get_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        self.require(path).await?;
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!(
            "{}/{}?expires={}&token={}",
            self.base_url,
            path,
            expires,
            Uuid::new_v4().simple()
        ))
    }
}
