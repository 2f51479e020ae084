//! Bounded in-process record cache.

use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::models::{api_key::ApiKey, user::User};

/// A cached lookup result.
#[derive(Debug, Clone)]
pub enum CachedRecord {
    User(User),
    Key(ApiKey),
    /// The store had nothing under this key
    Missing,
}

/// Cache of decoded records, keyed by the same paths as the blob store.
///
/// Capacity is a fixed entry count. Eviction is moka's TinyLFU policy, so
/// frequently verified keys stay resident. Entries are removed on every
/// write and never updated in place.
///
/// Every entry also expires `time_to_live` after insertion. A reader racing
/// a writer can insert the record it read before the write landed; the TTL
/// bounds how long such a stale copy is served.
#[derive(Debug, Clone)]
pub struct RecordCache {
    cache: MokaCache<String, CachedRecord>,
}

impl RecordCache {
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        Self {
            cache: MokaCache::builder()
                .max_capacity(max_capacity)
                .time_to_live(time_to_live)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CachedRecord> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: String, record: CachedRecord) {
        self.cache.insert(key, record).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;

    #[tokio::test]
    async fn insert_get_invalidate() {
        let cache = RecordCache::new(10, Duration::from_secs(60));
        let key = ApiKey::new("abc".into(), "owner", now());

        cache
            .insert("keys/abc".into(), CachedRecord::Key(key.clone()))
            .await;
        assert!(matches!(
            cache.get("keys/abc").await,
            Some(CachedRecord::Key(cached)) if cached == key
        ));

        cache.invalidate("keys/abc").await;
        assert!(cache.get("keys/abc").await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_the_ttl() {
        let cache = RecordCache::new(10, Duration::from_millis(50));
        let stale = ApiKey::new("abc".into(), "owner", now());
        cache.insert("keys/abc".into(), CachedRecord::Key(stale)).await;

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(cache.get("keys/abc").await.is_none());
    }

    #[tokio::test]
    async fn negative_entries_are_cached() {
        let cache = RecordCache::new(10, Duration::from_secs(60));

        cache.insert("users/x".into(), CachedRecord::Missing).await;

        assert!(matches!(
            cache.get("users/x").await,
            Some(CachedRecord::Missing)
        ));
    }
}
