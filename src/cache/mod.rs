//! Read-through cache over a key/value store.
//!
//! Values are JSON snapshots of read DTOs. Every failure on the read path
//! (store unreachable, entry malformed) degrades to a miss, and every failure
//! on the write path is logged and swallowed: the database stays the source of
//! truth and cached entries are bounded by their TTL.

pub mod invalidation;
pub mod keys;
#[cfg(test)]
pub mod memory;
pub mod redis_store;

use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::AppResult;
pub use invalidation::Mutation;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> anyhow::Result<()>;
    async fn delete(&self, keys: &[String]) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    default_ttl: u64,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: u64) -> Self {
        Self { store, default_ttl }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "cache unavailable, reading from database");
                return None;
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "malformed cache entry, treating as miss");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "cache serialization failed");
                return;
            }
        };
        if let Err(e) = self.store.set(key, raw, ttl_seconds).await {
            warn!(key, error = %e, "cache populate failed");
        } else {
            debug!(key, ttl_seconds, "cache populated");
        }
    }

    /// Returns the cached value under `key`, or runs `load` and caches its
    /// result. Errors from `load` are returned as-is and nothing is cached.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, load: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.get_or_load_with_ttl(key, self.default_ttl, load).await
    }

    pub async fn get_or_load_with_ttl<T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        load: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.set_with_ttl(key, &value, ttl_seconds).await;
        Ok(value)
    }

    pub async fn remove(&self, key: &str) {
        self.delete_keys(&[key.to_string()]).await;
    }

    /// Drops every key the mutation can have made stale. Never fails.
    pub async fn invalidate(&self, mutation: &Mutation) {
        let keys = mutation.affected_keys();
        self.delete_keys(&keys).await;
    }

    pub async fn invalidate_all(&self, mutations: &[Mutation]) {
        self.delete_keys(&invalidation::keys_for(mutations)).await;
    }

    async fn delete_keys(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        match self.store.delete(keys).await {
            Ok(()) => debug!(count = keys.len(), "cache keys invalidated"),
            Err(e) => warn!(error = %e, ?keys, "cache invalidation failed; entries expire by ttl"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryCache;
    use super::*;
    use crate::error::AppError;
    use serde::Deserialize;
    use time::{macros::date, Date};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct WeightSnapshot {
        weight: f64,
        #[serde(with = "crate::dates::iso_date")]
        recorded_at: Date,
    }

    fn cache_with(store: MemoryCache) -> (Cache, Arc<MemoryCache>) {
        let store = Arc::new(store);
        (Cache::new(store.clone(), 3600), store)
    }

    #[tokio::test]
    async fn roundtrip_keeps_dates() {
        let (cache, _) = cache_with(MemoryCache::new());
        let snap = WeightSnapshot {
            weight: 71.3,
            recorded_at: date!(2024 - 12 - 31),
        };
        cache.set("user_weight:u:2024-12-31", &snap).await;
        let back: Option<WeightSnapshot> = cache.get("user_weight:u:2024-12-31").await;
        assert_eq!(back, Some(snap));
    }

    #[tokio::test]
    async fn malformed_entry_is_a_miss() {
        let (cache, store) = cache_with(MemoryCache::new());
        store.insert_raw("user_weight:u:2024-12-31", "{\"weight\": 7");
        let got: Option<WeightSnapshot> = cache.get("user_weight:u:2024-12-31").await;
        assert!(got.is_none());

        store.insert_raw("user_weight:u:2024-12-30", r#"{"weight":1.0,"recorded_at":"30/12/2024"}"#);
        let got: Option<WeightSnapshot> = cache.get("user_weight:u:2024-12-30").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn unavailable_store_is_a_miss_and_writes_do_not_fail() {
        let (cache, _) = cache_with(MemoryCache::unavailable());
        cache.set("k", &1_u32).await;
        assert_eq!(cache.get::<u32>("k").await, None);
        cache.invalidate(&Mutation::WeightSaved {
            user_id: uuid::Uuid::new_v4(),
            date: date!(2024 - 01 - 01),
        })
        .await;
    }

    #[tokio::test]
    async fn get_or_load_populates_once() {
        let (cache, store) = cache_with(MemoryCache::new());
        let first: u32 = cache.get_or_load("n", || async { Ok(7) }).await.unwrap();
        let second: u32 = cache
            .get_or_load("n", || async { Err(AppError::not_found("never called")) })
            .await
            .unwrap();
        assert_eq!((first, second), (7, 7));
        assert_eq!(store.ttl_of("n"), Some(3600));
    }

    #[tokio::test]
    async fn get_or_load_does_not_cache_errors() {
        let (cache, store) = cache_with(MemoryCache::new());
        let res: AppResult<u32> = cache
            .get_or_load("missing", || async { Err(AppError::not_found("Meal not found")) })
            .await;
        assert!(matches!(res, Err(AppError::NotFound(_))));
        assert!(!store.contains("missing"));
    }
}
