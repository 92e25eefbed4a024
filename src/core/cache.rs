//! Time-bounded memoisation of upstream responses.

use crate::utils::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Identifies one logical request: the operation plus its fully-resolved parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: String,
    pub params: String,
}

impl CacheKey {
    pub fn new(operation: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: params.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    stored_at: Instant,
}

/// Parsed responses kept for `ttl`. Two callers missing on the same key may both
/// fetch; the later insert wins. Only successful fetches are stored.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: CacheKey, value: serde_json::Value) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<serde_json::Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!("Cache hit for {} {}", key.operation, key.params);
            return Ok(value);
        }

        let value = fetch().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::BacklinkError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_identical_key_fetched_once_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let key = CacheKey::new("tier2", "target=https%3A%2F%2Fa.com");

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"metrics": {"live": 3}}))
                })
                .await
                .unwrap();
            assert_eq!(value["metrics"]["live"], 3);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_refetched() {
        let cache = ResponseCache::new(Duration::from_millis(30));
        let calls = AtomicUsize::new(0);
        let key = CacheKey::new("bulk", "target=a.com&limit=10");

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!([]))
        };

        cache.get_or_fetch(key.clone(), fetch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.get_or_fetch(key.clone(), fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = ResponseCache::default();
        let key = CacheKey::new("bulk", "target=a.com");

        let failed = cache
            .get_or_fetch(key.clone(), || async {
                Err(BacklinkError::parse("bulk", "truncated body"))
            })
            .await;
        assert!(failed.is_err());
        assert_eq!(cache.get(&key).await, None);

        let value = cache
            .get_or_fetch(key, || async { Ok(json!({"ok": true})) })
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_distinct_params_are_distinct_entries() {
        let cache = ResponseCache::default();
        cache
            .insert(CacheKey::new("bulk", "limit=10"), json!(1))
            .await;
        cache
            .insert(CacheKey::new("bulk", "limit=20"), json!(2))
            .await;

        assert_eq!(cache.get(&CacheKey::new("bulk", "limit=10")).await, Some(json!(1)));
        assert_eq!(cache.get(&CacheKey::new("bulk", "limit=20")).await, Some(json!(2)));
        assert_eq!(cache.get(&CacheKey::new("tier2", "limit=20")).await, None);
    }
}
