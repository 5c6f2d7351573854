use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;

use super::CacheStore;

/// In-process store for tests. TTLs are recorded, not enforced.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, u64)>>,
    unavailable: bool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails, like a Redis that is down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.lock().insert(key.to_string(), (raw.to_string(), 0));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.lock().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, u64)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.unavailable {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.check()?;
        Ok(self.lock().get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> anyhow::Result<()> {
        self.check()?;
        self.lock().insert(key.to_string(), (value, ttl_seconds));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> anyhow::Result<()> {
        self.check()?;
        let mut entries = self.lock();
        for k in keys {
            entries.remove(k);
        }
        Ok(())
    }
}
