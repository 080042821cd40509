use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Key/value cache with absolute expiry (epoch seconds). Payloads are opaque JSON strings.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
}

/// Cache used when caching is disabled: every lookup misses, every write is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Storage for NoCache {
    async fn get_cache(&self, _key: &str, _now: i64) -> Result<Option<String>> { Ok(None) }
    async fn put_cache(&self, _key: &str, _payload: &str, _expires_at: i64) -> Result<()> { Ok(()) }
}

/// In-process cache, handy for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, i64)>>,
}

impl MemoryCache {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.lock().map(|m| m.len()).unwrap_or(0) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().map(|m| m.keys().cloned().collect()).unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryCache {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let mut map = self.entries.lock().map_err(|_| anyhow::anyhow!("memory cache poisoned"))?;
        let fresh = map.get(key).map(|(payload, exp)| (*exp > now).then(|| payload.clone()));
        if let Some(None) = fresh {
            map.remove(key);
        }
        Ok(fresh.flatten())
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        let mut map = self.entries.lock().map_err(|_| anyhow::anyhow!("memory cache poisoned"))?;
        map.insert(key.to_string(), (payload.to_string(), expires_at));
        Ok(())
    }
}

pub fn current_epoch() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}
