//! Durable blob stores for the KV backend.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{db::DbPool, error::AppError};

/// Byte storage addressed by string keys.
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Thread-safe in-memory blob store.
///
/// Backs the `memory` storage backend and the tests. Data is lost when the
/// process terminates.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls that reached this store.
    #[cfg(test)]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every following `put` and `delete` fail, as an unreachable store would.
    #[cfg(test)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a blob directly, skipping any cache in front of this store.
    #[cfg(test)]
    pub fn put_raw(&self, key: &str, body: Vec<u8>) {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(key.to_string(), body);
        }
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage("blob store is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let blobs = self
            .blobs
            .read()
            .map_err(|e| AppError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(blobs.get(key).cloned())
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), AppError> {
        self.check_writable()?;

        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| AppError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        blobs.insert(key.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.check_writable()?;

        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| AppError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        blobs.remove(key);
        Ok(())
    }
}

/// Blob store on the Postgres `blobs` table.
#[derive(Debug, Clone)]
pub struct PgBlobStore {
    pool: DbPool,
}

impl PgBlobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let body = sqlx::query_scalar::<_, Vec<u8>>("SELECT body FROM blobs WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(body)
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO blobs (key, body)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
            SET body = EXCLUDED.body,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM blobs WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemoryBlobStore::new();

        assert_eq!(store.get("users/a").await.unwrap(), None);

        store.put("users/a", b"{}".to_vec()).await.unwrap();
        assert_eq!(store.get("users/a").await.unwrap(), Some(b"{}".to_vec()));

        store.delete("users/a").await.unwrap();
        assert_eq!(store.get("users/a").await.unwrap(), None);
        assert_eq!(store.reads(), 3);
    }

    #[tokio::test]
    async fn failing_writes_leave_data_untouched() {
        let store = InMemoryBlobStore::new();
        store.put("keys/a", b"1".to_vec()).await.unwrap();
        store.set_fail_writes(true);

        assert!(matches!(
            store.put("keys/a", b"2".to_vec()).await,
            Err(AppError::Storage(_))
        ));
        assert!(store.delete("keys/a").await.is_err());
        assert_eq!(store.get("keys/a").await.unwrap(), Some(b"1".to_vec()));
    }
}
