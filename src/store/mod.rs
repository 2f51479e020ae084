//! Record persistence.
//!
//! `RecordStore` is the contract the services use. Two backings implement it:
//!
//! - [`kv::KvRecordStore`]: JSON records in a [`blob::BlobStore`] behind a
//!   read-through, invalidate-on-write [`cache::RecordCache`]. Users embed
//!   snapshots of their keys; keeping those in sync is the caller's job
//!   (save the key, then the user). A failure between the two writes leaves
//!   the snapshot stale.
//! - [`relational::PgRecordStore`]: `people` and `api_keys` tables joined by
//!   a foreign key. The user's key map is read from `api_keys`, so it cannot
//!   go stale.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{api_key::ApiKey, user::User},
    services::key_generator,
};

pub mod blob;
pub mod cache;
pub mod kv;
pub mod relational;

/// Storage contract for users and API keys.
///
/// Saves are idempotent upserts that overwrite every mutable field.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn get_key(&self, api_key: &str) -> Result<Option<ApiKey>, AppError>;

    async fn save_user(&self, user: &User) -> Result<(), AppError>;

    async fn save_key(&self, key: &ApiKey) -> Result<(), AppError>;

    /// Hard delete. Deleting a key that does not exist is not an error.
    async fn delete_key(&self, api_key: &str) -> Result<(), AppError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), AppError>;

    async fn get_user_by_social_id(&self, social_id: &str) -> Result<Option<User>, AppError> {
        self.get_user(&key_generator::user_id_for(social_id)).await
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{blob::InMemoryBlobStore, cache::RecordCache, kv::KvRecordStore};

    /// A KV store over an in-memory blob store, plus a handle on the blobs.
    pub fn memory_store() -> (KvRecordStore, Arc<InMemoryBlobStore>) {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let cache = RecordCache::new(100, Duration::from_secs(60));
        let store = KvRecordStore::new(blobs.clone(), cache, "");
        (store, blobs)
    }
}
