//! JSON records in a blob store behind a read-through cache.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::AppError,
    models::{api_key::ApiKey, user::User},
};

use super::{
    RecordStore,
    blob::BlobStore,
    cache::{CachedRecord, RecordCache},
};

/// Record store keeping `users/<id>` and `keys/<api_key>` blobs.
///
/// # Caching
///
/// - Reads consult the cache first. On a miss the blob is fetched, decoded
///   and cached; an absent blob is cached as `Missing` so unknown keys do not
///   hit the store on every verification.
/// - Writes remove the cache entry after the blob write succeeds. A failed
///   write leaves the cache untouched.
///
/// Concurrent writers to the same record race: the last write wins. A read
/// racing a write can cache the old record; it is served until the cache
/// TTL expires it.
#[derive(Debug, Clone)]
pub struct KvRecordStore {
    blobs: Arc<dyn BlobStore>,
    cache: RecordCache,
    prefix: String,
}

impl KvRecordStore {
    pub fn new(blobs: Arc<dyn BlobStore>, cache: RecordCache, prefix: impl Into<String>) -> Self {
        Self {
            blobs,
            cache,
            prefix: prefix.into(),
        }
    }

    fn user_path(&self, user_id: &str) -> String {
        join_path(&self.prefix, "users", user_id)
    }

    fn key_path(&self, api_key: &str) -> String {
        join_path(&self.prefix, "keys", api_key)
    }

    async fn write(&self, path: String, body: Vec<u8>) -> Result<(), AppError> {
        self.blobs.put(&path, body).await?;
        self.cache.invalidate(&path).await;
        Ok(())
    }
}

/// Join path segments with `/`, skipping an empty prefix.
fn join_path(prefix: &str, kind: &str, id: &str) -> String {
    let prefix = prefix.trim_end_matches('/');

    if prefix.is_empty() {
        format!("{}/{}", kind, id)
    } else {
        format!("{}/{}/{}", prefix, kind, id)
    }
}

#[async_trait]
impl RecordStore for KvRecordStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let path = self.user_path(user_id);

        match self.cache.get(&path).await {
            Some(CachedRecord::User(user)) => {
                debug!(user_id, "Found user in cache");
                return Ok(Some(user));
            }
            Some(CachedRecord::Missing) => return Ok(None),
            _ => {}
        }

        let Some(body) = self.blobs.get(&path).await? else {
            self.cache.insert(path, CachedRecord::Missing).await;
            return Ok(None);
        };

        let user = serde_json::from_slice::<User>(&body)?.with_derived_id();
        self.cache.insert(path, CachedRecord::User(user.clone())).await;
        debug!(user_id, "Stored user in cache");

        Ok(Some(user))
    }

    async fn get_key(&self, api_key: &str) -> Result<Option<ApiKey>, AppError> {
        let path = self.key_path(api_key);

        match self.cache.get(&path).await {
            Some(CachedRecord::Key(key)) => {
                debug!(api_key, "Found key in cache");
                return Ok(Some(key));
            }
            Some(CachedRecord::Missing) => return Ok(None),
            _ => {}
        }

        let Some(body) = self.blobs.get(&path).await? else {
            self.cache.insert(path, CachedRecord::Missing).await;
            return Ok(None);
        };

        let key: ApiKey = serde_json::from_slice(&body)?;
        self.cache.insert(path, CachedRecord::Key(key.clone())).await;
        debug!(api_key, "Stored key in cache");

        Ok(Some(key))
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        let body = serde_json::to_vec(user)?;
        self.write(self.user_path(&user.id), body).await
    }

    async fn save_key(&self, key: &ApiKey) -> Result<(), AppError> {
        let body = serde_json::to_vec(key)?;
        self.write(self.key_path(&key.api_key), body).await
    }

    async fn delete_key(&self, api_key: &str) -> Result<(), AppError> {
        let path = self.key_path(api_key);
        self.blobs.delete(&path).await?;
        self.cache.invalidate(&path).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.blobs.ping().await
    }
}
