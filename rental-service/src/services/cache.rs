//! Tagged, TTL-bounded cache for computed read models.
//!
//! Values are stored as JSON strings under a key and may carry any number of
//! tags; invalidating a tag drops every key stored with it.

use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, Client, Script};
use serde::{de::DeserializeOwned, Serialize};
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::services::metrics::STATS_CACHE_LOOKUPS;

/// How long a tag remembers its last invalidation after its keys are gone.
/// A miss that computes for longer than this may store a stale value.
pub const GENERATION_RETENTION: Duration = Duration::from_secs(3600);

/// A tag together with the generation observed before computing a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVersion {
    pub tag: String,
    pub generation: u64,
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;

    /// Current generation of `tag`; bumped by every invalidation.
    async fn generation(&self, tag: &str) -> Result<u64, anyhow::Error>;

    /// Store `value` unless one of `tags` has been invalidated since its
    /// generation was read. Returns whether the value was stored.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        tags: &[TagVersion],
    ) -> Result<bool, anyhow::Error>;

    async fn invalidate_tag(&self, tag: &str) -> Result<(), anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

// =============================================================================
// In-process backend
// =============================================================================

/// Full sweep of expired entries every this many writes.
const PURGE_EVERY_WRITES: u64 = 256;

struct Entry {
    value: String,
    expires_at: Instant,
    tags: Vec<String>,
}

#[derive(Default)]
struct TagState {
    generation: u64,
    keys: HashSet<String>,
    invalidated_at: Option<Instant>,
}

impl TagState {
    fn is_prunable(&self, now: Instant) -> bool {
        self.keys.is_empty()
            && self
                .invalidated_at
                .map_or(true, |at| now.duration_since(at) >= GENERATION_RETENTION)
    }
}

/// Process-local cache.
///
/// Expired entries are dropped when read and by a periodic sweep. Writes and
/// invalidations serialise on the tag table, so a write never lands after an
/// invalidation it did not observe.
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
    tags: Mutex<HashMap<String, TagState>>,
    writes: AtomicU64,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tags(&self) -> MutexGuard<'_, HashMap<String, TagState>> {
        self.tags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop expired entries and tags that no longer track anything.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut tags = self.tags();
        self.entries.retain(|_, entry| entry.expires_at > now);
        tags.retain(|_, state| {
            state.keys.retain(|key| self.entries.contains_key(key));
            !state.is_prunable(now)
        });
    }

    fn forget_expired(&self, key: &str, entry_tags: &[String]) {
        let now = Instant::now();
        let mut tags = self.tags();
        // The key may have been written again since it expired.
        if self.entries.contains_key(key) {
            return;
        }
        for tag in entry_tags {
            if let Some(state) = tags.get_mut(tag) {
                state.keys.remove(key);
                if state.is_prunable(now) {
                    tags.remove(tag);
                }
            }
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        let expired = self
            .entries
            .remove_if(key, |_, entry| entry.expires_at <= now);
        if let Some((_, entry)) = expired {
            self.forget_expired(key, &entry.tags);
        }
        Ok(None)
    }

    async fn generation(&self, tag: &str) -> Result<u64, anyhow::Error> {
        Ok(self.tags().get(tag).map_or(0, |state| state.generation))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        tags: &[TagVersion],
    ) -> Result<bool, anyhow::Error> {
        {
            let mut table = self.tags();
            let current = |tag: &str| table.get(tag).map_or(0, |state| state.generation);
            if tags.iter().any(|t| current(&t.tag) != t.generation) {
                return Ok(false);
            }

            self.entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Instant::now() + ttl,
                    tags: tags.iter().map(|t| t.tag.clone()).collect(),
                },
            );
            for t in tags {
                table
                    .entry(t.tag.clone())
                    .or_default()
                    .keys
                    .insert(key.to_string());
            }
        }

        let written = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if written % PURGE_EVERY_WRITES == 0 {
            self.purge_expired();
        }
        Ok(true)
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<(), anyhow::Error> {
        let mut table = self.tags();
        let state = table.entry(tag.to_string()).or_default();
        state.generation += 1;
        state.invalidated_at = Some(Instant::now());
        for key in state.keys.drain() {
            self.entries.remove(&key);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

// =============================================================================
// Redis backend
// =============================================================================

const REDIS_PREFIX: &str = "rental:cache";

/// KEYS: value key, then (tag set, generation) pairs.
/// ARGV: value, ttl ms, then the expected generation of each tag.
static SET_IF_CURRENT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
local tags = (#KEYS - 1) / 2
for i = 1, tags do
  local current = tonumber(redis.call('GET', KEYS[2 * i + 1]) or '0')
  if current ~= tonumber(ARGV[i + 2]) then
    return 0
  end
end
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
for i = 1, tags do
  redis.call('SADD', KEYS[2 * i], KEYS[1])
  redis.call('PEXPIRE', KEYS[2 * i], tonumber(ARGV[2]) * 2)
end
return 1
",
    )
});

/// KEYS: tag set, generation. ARGV: generation retention in ms.
static INVALIDATE_TAG: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
redis.call('INCR', KEYS[2])
redis.call('PEXPIRE', KEYS[2], ARGV[1])
local members = redis.call('SMEMBERS', KEYS[1])
for _, key in ipairs(members) do
  redis.call('DEL', key)
end
redis.call('DEL', KEYS[1])
return #members
",
    )
});

/// Shared cache for multi-instance deployments. Tags are Redis sets of keys
/// plus a generation counter.
#[derive(Clone)]
pub struct RedisCache {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to Redis cache");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis cache");

        Ok(Self {
            _client: client,
            manager,
        })
    }

    fn value_key(key: &str) -> String {
        format!("{}:value:{}", REDIS_PREFIX, key)
    }

    fn tag_key(tag: &str) -> String {
        format!("{}:tag:{}", REDIS_PREFIX, tag)
    }

    fn generation_key(tag: &str) -> String {
        format!("{}:gen:{}", REDIS_PREFIX, tag)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(Self::value_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get cache: {}", e))
    }

    async fn generation(&self, tag: &str) -> Result<u64, anyhow::Error> {
        let mut conn = self.manager.clone();
        let generation: Option<u64> = redis::cmd("GET")
            .arg(Self::generation_key(tag))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read cache tag generation: {}", e))?;
        Ok(generation.unwrap_or(0))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        tags: &[TagVersion],
    ) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let mut invocation = SET_IF_CURRENT.prepare_invoke();
        invocation.key(Self::value_key(key)).arg(value).arg(ttl_ms);
        for t in tags {
            invocation
                .key(Self::tag_key(&t.tag))
                .key(Self::generation_key(&t.tag))
                .arg(t.generation);
        }

        let stored: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to set cache: {}", e))?;
        Ok(stored == 1)
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        INVALIDATE_TAG
            .key(Self::tag_key(tag))
            .key(Self::generation_key(tag))
            .arg(GENERATION_RETENTION.as_millis() as u64)
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Failed to invalidate cache tag: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

// =============================================================================
// Typed front
// =============================================================================

/// Typed memoisation over a [`CacheBackend`].
///
/// Backend failures never fail the caller: a broken read is a miss and a
/// broken write or invalidation is logged and dropped. Concurrent misses on
/// the same key may each run `compute`.
#[derive(Clone)]
pub struct StatsCache {
    backend: Arc<dyn CacheBackend>,
}

impl StatsCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCache::new()))
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        tags: &[String],
        compute: F,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let shape = key.split(':').next().unwrap_or(key);

        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    STATS_CACHE_LOOKUPS.with_label_values(&[shape, "hit"]).inc();
                    tracing::debug!(key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    STATS_CACHE_LOOKUPS.with_label_values(&[shape, "error"]).inc();
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {
                STATS_CACHE_LOOKUPS.with_label_values(&[shape, "miss"]).inc();
            }
            Err(e) => {
                STATS_CACHE_LOOKUPS.with_label_values(&[shape, "error"]).inc();
                tracing::warn!(key, error = %e, "Cache read failed, computing");
            }
        }

        // Generations are read before computing so an invalidation that
        // lands mid-compute keeps the result out of the cache.
        let versions = match self.versions(tags).await {
            Ok(versions) => Some(versions),
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache tag read failed, result will not be stored");
                None
            }
        };

        let value = compute().await?;

        let Some(versions) = versions else {
            return Ok(value);
        };
        match serde_json::to_string(&value) {
            Ok(raw) => match self.backend.set(key, &raw, ttl, &versions).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(key, "Invalidated while computing, not stored"),
                Err(e) => tracing::warn!(key, error = %e, "Cache write failed"),
            },
            Err(e) => tracing::warn!(key, error = %e, "Failed to encode cache entry"),
        }

        Ok(value)
    }

    async fn versions(&self, tags: &[String]) -> Result<Vec<TagVersion>, anyhow::Error> {
        let mut versions = Vec::with_capacity(tags.len());
        for tag in tags {
            versions.push(TagVersion {
                tag: tag.clone(),
                generation: self.backend.generation(tag).await?,
            });
        }
        Ok(versions)
    }

    pub async fn invalidate(&self, tag: &str) {
        match self.backend.invalidate_tag(tag).await {
            Ok(()) => tracing::debug!(tag, "Cache tag invalidated"),
            Err(e) => tracing::warn!(tag, error = %e, "Cache invalidation failed"),
        }
    }
}
