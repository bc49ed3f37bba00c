//! TTL cache in front of the GitHub API.
//!
//! [`Cache`] is the facade the rest of the crate talks to. It owns a
//! [`CacheStore`] and turns every store failure into a miss or a no-op, so a
//! missing or broken key/value service only costs extra API calls.

use crate::error::CacheError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default expiry for cached API responses
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default bound on a single store round trip
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(500);

/// A raw key/value backend with per-key expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetches the value stored under `key`, if it has not expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Round-trips to the backend
    async fn ping(&self) -> Result<(), CacheError>;

    /// Releases the connection. Later calls fail with [`CacheError::Connection`].
    async fn close(&self) {}
}

/// Redis-backed store using a reconnecting connection manager
pub struct RedisStore {
    manager: RwLock<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Opens a connection to the Redis server at `url`
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager: RwLock::new(Some(manager)),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        self.manager
            .read()
            .await
            .clone()
            .ok_or_else(|| CacheError::Connection("connection closed".into()))
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.manager.write().await.take();
    }
}

/// Process-local store, backing [`Cache::in_memory`].
///
/// Expired entries are dropped on the next write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (String, Instant, Duration)>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, stored, ttl)| stored.elapsed() < *ttl)
            .map(|(value, _, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, stored, entry_ttl)| stored.elapsed() < *entry_ttl);
        entries.insert(key.to_string(), (value, Instant::now(), ttl));
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Store used when no backend is configured: always misses, never connected
#[derive(Debug, Default)]
pub struct NoOpStore;

#[async_trait]
impl CacheStore for NoOpStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Connection("cache disabled".into()))
    }
}

/// JSON cache facade. Cloning shares the underlying store.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    operation_timeout: Duration,
}

impl Cache {
    /// Wraps an existing store
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Sets the bound applied to every store call
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Connects to Redis once at startup.
    ///
    /// A failed connection yields a disabled cache rather than an error.
    pub async fn connect(url: &str, operation_timeout: Duration) -> Self {
        match tokio::time::timeout(operation_timeout * 10, RedisStore::connect(url)).await {
            Ok(Ok(store)) => {
                info!("Connected to cache store");
                Self::with_store(Arc::new(store)).with_operation_timeout(operation_timeout)
            }
            Ok(Err(e)) => {
                warn!("Cache store unavailable, continuing without cache: {}", e);
                Self::disabled()
            }
            Err(_) => {
                warn!("Cache store connection timed out, continuing without cache");
                Self::disabled()
            }
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::with_store(Arc::new(NoOpStore))
    }

    /// A cache backed by process memory
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Fetches and decodes the JSON value under `key`. Any failure is a miss.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let raw = match self.bounded(self.store.get(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss: {}", key);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, CacheError::from(e));
                None
            }
        }
    }

    /// Encodes and stores `value` under `key` for `ttl`. Failures are logged and dropped.
    pub async fn set(&self, key: &str, value: &Value, ttl: Duration) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Cache write skipped for {}: {}", key, CacheError::from(e));
                return;
            }
        };
        if let Err(e) = self.bounded(self.store.set(key, encoded, ttl)).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Checks if the backend answers a ping
    pub async fn check_connection(&self) -> bool {
        match self.bounded(self.store.ping()).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Cache connection check failed: {}", e);
                false
            }
        }
    }

    /// Closes the backend connection; the cache behaves as disabled afterwards
    pub async fn shutdown(&self) {
        self.store.close().await;
        info!("Cache store connection closed");
    }

    async fn bounded<T>(
        &self,
        operation: impl std::future::Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.operation_timeout, operation)
            .await
            .unwrap_or(Err(CacheError::Timeout(self.operation_timeout)))
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}
