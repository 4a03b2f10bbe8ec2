use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::core::stats::StatsSample;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache operation timed out: {0}")]
    Timeout(String),
}

/// Key-value store the engine keeps providers and match results in.
///
/// Implementations must be safe to share between concurrent matching calls.
#[async_trait]
pub trait RosterCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn ping(&self) -> bool {
        true
    }
}

/// Fetch and decode a JSON record
pub async fn get_json<T>(cache: &dyn RosterCache, key: &str) -> Result<Option<T>, CacheError>
where
    T: DeserializeOwned,
{
    match cache.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode a value as JSON and store it
pub async fn set_json<T>(cache: &dyn RosterCache, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(value)?;
    cache.set(key, bytes, ttl).await
}

/// Receives one record per matching pass. Delivery is best-effort.
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn record(&self, sample: &StatsSample);
}

/// Sink that only emits the sample as a log event
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatsSink;

#[async_trait]
impl StatsSink for LogStatsSink {
    async fn record(&self, sample: &StatsSample) {
        tracing::debug!(
            request_id = %sample.request_id,
            total_coaches = sample.total_coaches,
            matches_found = sample.matches_found,
            processing_time_ms = sample.processing_time_ms,
            algorithm_version = %sample.algorithm_version,
            "Processing stats"
        );
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    bytes: Vec<u8>,
    ttl: Duration,
}

/// Per-entry TTL for the in-process tier
struct EntryExpiry;

impl moka::Expiry<String, CachedEntry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &CachedEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// L1 lifetime for a value read from Redis.
///
/// `pttl_ms` is the PTTL reply: negative when the key has no expiry or is gone.
/// Such values are not promoted.
fn promoted_ttl(pttl_ms: i64, l1_ttl: Duration) -> Option<Duration> {
    if pttl_ms <= 0 {
        return None;
    }
    Some(Duration::from_millis(pttl_ms as u64).min(l1_ttl))
}

fn build_local_cache(capacity: u64) -> moka::future::Cache<String, CachedEntry> {
    moka::future::Cache::builder()
        .max_capacity(capacity)
        .expire_after(EntryExpiry)
        .build()
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and L2 (Redis) caching strategy.
/// L1 is fastest but limited in size, L2 is shared across instances and is
/// the authority for key listings and expiry.
pub struct CacheManager {
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, CachedEntry>,
    l1_ttl: Duration,
    op_timeout: Duration,
    stats_capacity: usize,
}

impl CacheManager {
    /// Create a new cache manager
    pub async fn new(
        redis_url: &str,
        l1_size: u64,
        l1_ttl: Duration,
        op_timeout: Duration,
        stats_capacity: usize,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(format!("connect to {}", redis_url)))??;

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache: build_local_cache(l1_size),
            l1_ttl,
            op_timeout,
            stats_capacity: stats_capacity.max(1),
        })
    }

    /// Run a Redis call under the operation timeout
    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout(op.to_string())),
        }
    }
}

#[async_trait]
impl RosterCache for CacheManager {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        // Try L1 cache first
        if let Some(entry) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(entry.bytes));
        }

        // Try L2 cache (Redis), reading the remaining TTL alongside the value
        let (value, pttl_ms) = self
            .bounded("GET", async {
                let mut conn = self.redis.lock().await;
                let reply: redis::RedisResult<(Option<Vec<u8>>, i64)> = redis::pipe()
                    .cmd("GET")
                    .arg(key)
                    .cmd("PTTL")
                    .arg(key)
                    .query_async(&mut *conn)
                    .await;
                reply
            })
            .await?;

        match value {
            Some(bytes) => {
                tracing::trace!("L2 cache hit: {}", key);
                if let Some(ttl) = promoted_ttl(pttl_ms, self.l1_ttl) {
                    let entry = CachedEntry {
                        bytes: bytes.clone(),
                        ttl,
                    };
                    self.l1_cache.insert(key.to_string(), entry).await;
                }
                Ok(Some(bytes))
            }
            None => {
                tracing::trace!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let ttl_secs = ttl.as_secs().max(1);

        self.bounded("SETEX", async {
            let mut conn = self.redis.lock().await;
            let stored: redis::RedisResult<()> = redis::cmd("SETEX")
                .arg(key)
                .arg(ttl_secs)
                .arg(value.as_slice())
                .query_async(&mut *conn)
                .await;
            stored
        })
        .await?;

        let entry = CachedEntry {
            bytes: value,
            ttl: ttl.min(self.l1_ttl),
        };
        self.l1_cache.insert(key.to_string(), entry).await;

        tracing::trace!("Cache set: {} (TTL: {}s)", key, ttl_secs);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let pattern = format!("{}*", prefix);
        self.bounded("KEYS", async {
            let mut conn = self.redis.lock().await;
            let keys: redis::RedisResult<Vec<String>> =
                redis::cmd("KEYS").arg(&pattern).query_async(&mut *conn).await;
            keys
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        self.bounded("DEL", async {
            let mut conn = self.redis.lock().await;
            let removed: redis::RedisResult<()> = redis::cmd("DEL").arg(key).query_async(&mut *conn).await;
            removed
        })
        .await
    }

    async fn ping(&self) -> bool {
        let pong = self
            .bounded("PING", async {
                let mut conn = self.redis.lock().await;
                let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut *conn).await;
                pong
            })
            .await;
        match pong {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Redis health check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl StatsSink for CacheManager {
    async fn record(&self, sample: &StatsSample) {
        let member = match serde_json::to_string(sample) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to encode processing stats: {}", e);
                return;
            }
        };
        let score = sample.timestamp.timestamp_millis() as f64 / 1000.0;
        let keep_from = -(self.stats_capacity as i64) - 1;

        let result = self
            .bounded("ZADD", async {
                let mut conn = self.redis.lock().await;
                // Keep only the newest entries
                let written: redis::RedisResult<()> = redis::pipe()
                    .cmd("ZADD")
                    .arg(CacheKey::STATS)
                    .arg(score)
                    .arg(&member)
                    .ignore()
                    .cmd("ZREMRANGEBYRANK")
                    .arg(CacheKey::STATS)
                    .arg(0)
                    .arg(keep_from)
                    .ignore()
                    .query_async(&mut *conn)
                    .await;
                written
            })
            .await;

        if let Err(e) = result {
            tracing::error!("Failed to store processing stats: {}", e);
        }
    }
}

/// In-process cache with per-entry TTL.
///
/// Stands in for Redis when it is unreachable and backs the test suite.
#[derive(Clone)]
pub struct MemoryCache {
    entries: moka::future::Cache<String, CachedEntry>,
}

impl MemoryCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: build_local_cache(capacity),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl RosterCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(key).await.map(|entry| entry.bytes))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CachedEntry { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.entries.run_pending_tasks().await;
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    pub const PROVIDER_PREFIX: &'static str = "provider:";
    pub const MATCH_RESULT_PREFIX: &'static str = "match_result:";
    pub const STATS: &'static str = "processing_stats";

    /// Build a cache key for a provider profile
    pub fn provider(provider_id: &str) -> String {
        format!("{}{}", Self::PROVIDER_PREFIX, provider_id)
    }

    /// Build a cache key for the ranked results of a request
    pub fn match_result(request_id: &str) -> String {
        format!("{}{}", Self::MATCH_RESULT_PREFIX, request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn redis_cache(l1_ttl: Duration) -> CacheManager {
        CacheManager::new("redis://127.0.0.1:6379", 1000, l1_ttl, Duration::from_secs(2), 100)
            .await
            .expect("Failed to create cache")
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = redis_cache(Duration::from_secs(60)).await;

        let key = "provider:test";
        cache.set(key, b"value".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(key).await.unwrap(), Some(b"value".to_vec()));
        assert!(cache.list_keys("provider:").await.unwrap().contains(&key.to_string()));

        cache.delete(key).await.unwrap();
        assert_eq!(cache.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_l2_hit_keeps_remaining_ttl() {
        let writer = redis_cache(Duration::from_secs(3600)).await;
        let key = "match_result:ttl-check";
        writer.set(key, b"value".to_vec(), Duration::from_secs(1)).await.unwrap();

        // A second manager starts with an empty L1 and promotes from Redis
        let reader = redis_cache(Duration::from_secs(3600)).await;
        assert_eq!(reader.get(key).await.unwrap(), Some(b"value".to_vec()));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(reader.l1_cache.get(key).await.is_none());
        assert_eq!(reader.get(key).await.unwrap(), None);
    }

    #[test]
    fn test_promoted_ttl_bounded_by_redis() {
        let l1 = Duration::from_secs(3600);
        assert_eq!(promoted_ttl(5_000, l1), Some(Duration::from_secs(5)));
        assert_eq!(promoted_ttl(7_200_000, l1), Some(l1));
        // No expiry, or the key vanished between GET and PTTL
        assert_eq!(promoted_ttl(-1, l1), None);
        assert_eq!(promoted_ttl(-2, l1), None);
        assert_eq!(promoted_ttl(0, l1), None);
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new(100);
        cache.set("provider:a", b"a".to_vec(), Duration::from_secs(60)).await.unwrap();
        cache.set("provider:b", b"b".to_vec(), Duration::from_secs(60)).await.unwrap();
        cache.set("match_result:r", b"r".to_vec(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("provider:a").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(
            cache.list_keys(CacheKey::PROVIDER_PREFIX).await.unwrap(),
            vec!["provider:a", "provider:b"]
        );

        cache.delete("provider:a").await.unwrap();
        assert_eq!(cache.get("provider:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_honours_ttl() {
        let cache = MemoryCache::new(100);
        cache.set("provider:a", b"a".to_vec(), Duration::from_millis(50)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get("provider:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = MemoryCache::default();
        set_json(&cache, "k", &vec![1, 2, 3], Duration::from_secs(5)).await.unwrap();
        let value: Option<Vec<i32>> = get_json(&cache, "k").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
        let missing: Option<Vec<i32>> = get_json(&cache, "missing").await.unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::provider("coach_1"), "provider:coach_1");
        assert_eq!(CacheKey::match_result("req-9"), "match_result:req-9");
    }
}
