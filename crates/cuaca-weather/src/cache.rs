//! TTL cache over a [`CacheBackend`].
//!
//! Best-effort by contract: backing I/O failures and corrupted entries are
//! logged and read as misses, and failed writes are dropped. Nothing here
//! returns an error to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::storage::CacheBackend;

/// Key for the early-warning payload
pub const EARLY_WARNING_KEY: &str = "early_warning";

/// Key for the maritime payload
pub const MARITIME_KEY: &str = "maritime";

/// Source tag stored with entries written from a live fetch
pub const API_SOURCE: &str = "api";

/// Cache key for a region's forecast.
pub fn forecast_key(region_code: &str) -> String {
    format!("forecast_{}", region_code)
}

/// On-disk / in-memory record: `{ data, timestamp, ttl, source }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    /// Write time, milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Validity window in milliseconds
    pub ttl: u64,
    pub source: String,
}

impl CacheEntry {
    /// Usable iff `now - timestamp <= ttl`.
    pub fn is_fresh(&self, now_millis: i64) -> bool {
        let age = now_millis.saturating_sub(self.timestamp);
        age <= 0 || (age as u64) <= self.ttl
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    pub entries: usize,
    pub expired: usize,
}

pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend.kind())
            .finish()
    }
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        self.set_with_source(key, value, ttl, API_SOURCE).await;
    }

    pub async fn set_with_source<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        source: &str,
    ) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Cache serialize failed for {}: {}", key, e);
                return;
            }
        };

        let entry = CacheEntry {
            data,
            timestamp: self.now_millis(),
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            source: source.to_string(),
        };

        let contents = match serde_json::to_string(&entry) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Cache encode failed for {}: {}", key, e);
                return;
            }
        };

        match self.backend.write(key, &contents).await {
            Ok(()) => tracing::debug!("Cached {} (ttl {:?})", key, ttl),
            Err(e) => tracing::warn!("Cache write failed for {}: {}", key, e),
        }
    }

    /// Fresh value for `key`, or `None`. Expired entries are deleted on the way out.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.read_entry(key).await?;

        if !entry.is_fresh(self.now_millis()) {
            tracing::debug!("Cache entry {} expired", key);
            self.evict(key).await;
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cached {} has unexpected shape, treating as miss: {}", key, e);
                self.evict(key).await;
                None
            }
        }
    }

    /// Raw entry including metadata, without freshness checks.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.read_entry(key).await
    }

    pub async fn remove(&self, key: &str) {
        self.evict(key).await;
    }

    /// Evict every entry whose TTL has elapsed. Returns how many were removed.
    pub async fn clear_expired(&self) -> usize {
        let keys = match self.backend.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Cache scan failed: {}", e);
                return 0;
            }
        };

        let now = self.now_millis();
        let mut removed = 0;
        for key in keys {
            let stale = match self.read_entry(&key).await {
                Some(entry) => !entry.is_fresh(now),
                // Unreadable entries were already evicted by read_entry.
                None => false,
            };
            if stale {
                self.evict(&key).await;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Evicted {} expired cache entries", removed);
        }
        removed
    }

    /// Remove every entry unconditionally.
    pub async fn clear(&self) {
        match self.backend.keys().await {
            Ok(keys) => {
                for key in &keys {
                    self.evict(key).await;
                }
                tracing::info!("Cleared {} cache entries", keys.len());
            }
            Err(e) => tracing::warn!("Cache clear failed: {}", e),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let keys = self.backend.keys().await.unwrap_or_else(|e| {
            tracing::warn!("Cache scan failed: {}", e);
            Vec::new()
        });

        let now = self.now_millis();
        let mut entries = 0;
        let mut expired = 0;
        for key in keys {
            if let Some(entry) = self.read_entry(&key).await {
                entries += 1;
                if !entry.is_fresh(now) {
                    expired += 1;
                }
            }
        }

        CacheStats {
            backend: self.backend.kind(),
            entries,
            expired,
        }
    }

    /// Read and decode an entry. Unreadable or corrupt entries read as `None`;
    /// corrupt ones are also removed so they stop costing a decode.
    async fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let contents = match self.backend.read(key).await {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Corrupted cache entry {}, treating as miss: {}", key, e);
                self.evict(key).await;
                None
            }
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            tracing::warn!("Cache delete failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{FileBackend, MemoryBackend};

    fn memory_store() -> (CacheStore, Arc<ManualClock>, Arc<MemoryBackend>) {
        let clock = Arc::new(ManualClock::default());
        let backend = Arc::new(MemoryBackend::new());
        let store = CacheStore::new(backend.clone(), clock.clone());
        (store, clock, backend)
    }

    #[test]
    fn test_forecast_key_is_deterministic() {
        assert_eq!(forecast_key("3171031001"), "forecast_3171031001");
        assert_eq!(forecast_key("3171031001"), forecast_key("3171031001"));
        assert_ne!(forecast_key("3171031001"), forecast_key("3171031002"));
    }

    #[test]
    fn test_freshness_boundary() {
        let entry = CacheEntry {
            data: serde_json::Value::Null,
            timestamp: 1_000,
            ttl: 500,
            source: API_SOURCE.into(),
        };
        assert!(entry.is_fresh(1_000));
        assert!(entry.is_fresh(1_500));
        assert!(!entry.is_fresh(1_501));
    }

    #[tokio::test]
    async fn test_get_after_set_returns_value() {
        let (store, _, _) = memory_store();
        store
            .set("maritime", &vec![1, 2, 3], Duration::from_secs(60))
            .await;
        let value: Option<Vec<i32>> = store.get("maritime").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_expired_entry_is_purged_and_stays_gone() {
        let (store, clock, backend) = memory_store();
        let start = clock.now();
        store.set("k", &"v", Duration::from_millis(1_000)).await;

        clock.advance(Duration::from_millis(1_000));
        assert_eq!(store.get::<String>("k").await.as_deref(), Some("v"));

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.get::<String>("k").await, None);
        assert!(!backend.exists("k").await);

        // Rewinding time cannot resurrect a purged entry.
        clock.set(start);
        assert_eq!(store.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (store, _, _) = memory_store();
        store.set("k", &1, Duration::from_secs(5)).await;
        store.set("k", &2, Duration::from_secs(5)).await;
        assert_eq!(store.get::<i32>("k").await, Some(2));
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_a_miss() {
        let (store, _, backend) = memory_store();
        backend.write("k", "{not json").await.unwrap();

        assert_eq!(store.get::<String>("k").await, None);
        assert!(!backend.exists("k").await);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_miss() {
        let (store, _, _) = memory_store();
        store.set("k", &"text", Duration::from_secs(5)).await;
        assert_eq!(store.get::<Vec<u8>>("k").await, None);
    }

    #[tokio::test]
    async fn test_clear_expired_only_removes_stale() {
        let (store, clock, _) = memory_store();
        store.set("short", &1, Duration::from_secs(10)).await;
        store.set("long", &2, Duration::from_secs(600)).await;

        clock.advance(Duration::from_secs(60));
        assert_eq!(store.clear_expired().await, 1);

        assert_eq!(store.get::<i32>("short").await, None);
        assert_eq!(store.get::<i32>("long").await, Some(2));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (store, _, backend) = memory_store();
        store.set("a", &1, Duration::from_secs(60)).await;
        store.set("b", &2, Duration::from_secs(60)).await;

        store.clear().await;
        assert!(backend.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts_expired() {
        let (store, clock, _) = memory_store();
        store.set("a", &1, Duration::from_secs(1)).await;
        store.set("b", &2, Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(2));

        let stats = store.stats().await;
        assert_eq!(
            stats,
            CacheStats {
                backend: "memory",
                entries: 2,
                expired: 1
            }
        );
    }

    #[tokio::test]
    async fn test_file_store_persists_entry_layout() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileBackend::open(dir.path()).await.unwrap());
        let clock = Arc::new(ManualClock::default());
        let store = CacheStore::new(backend, clock.clone());

        store
            .set(&forecast_key("3171031001"), &"payload", Duration::from_secs(1800))
            .await;

        let raw = std::fs::read_to_string(dir.path().join("forecast_3171031001.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["data"], "payload");
        assert_eq!(json["ttl"], 1_800_000);
        assert_eq!(json["source"], "api");
        assert_eq!(json["timestamp"], clock.now().timestamp_millis());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileBackend::open(dir.path()).await.unwrap());
        let store = CacheStore::new(backend, Arc::new(ManualClock::default()));

        std::fs::write(dir.path().join("maritime.json"), b"\x00\x01garbage").unwrap();
        assert_eq!(store.get::<serde_json::Value>(MARITIME_KEY).await, None);
        assert!(!dir.path().join("maritime.json").exists());
    }
}
