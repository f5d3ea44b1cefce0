//! Durable cache for aggregated snapshots.
//!
//! Storage failures never leave this module: the `try_*` methods report them,
//! the plain methods log and absorb them so callers see a cache miss.

use std::sync::Arc;
use std::time::Duration;

use govdata::{CatalystSnapshot, MeshData, Millis};
use kvstore::{Storage, StorageError};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::store_exec::with_store_blocking;

pub const MESH_STORAGE_KEY: &str = "meshGovData";
pub const CATALYST_STORAGE_KEY: &str = "catalystData";
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(3 * 24 * 60 * 60);

const PROBE_KEY: &str = "__test__";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable")]
    Unavailable,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cached value is malformed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A cached aggregate that records when it was fetched.
pub trait CacheEntry: Serialize + DeserializeOwned + Send + 'static {
    fn last_fetched(&self) -> Millis;
}

impl CacheEntry for MeshData {
    fn last_fetched(&self) -> Millis {
        self.last_fetched
    }
}

impl CacheEntry for CatalystSnapshot {
    fn last_fetched(&self) -> Millis {
        self.last_fetched
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub duration: Duration,
}

impl CachePolicy {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.duration.is_zero()
    }

    /// `now - last_fetched < duration`. A zero duration is never fresh, and
    /// neither is a timestamp from the future.
    pub fn is_fresh(&self, last_fetched: Millis, now: Millis) -> bool {
        if !self.is_enabled() || last_fetched > now {
            return false;
        }
        let duration_ms = i64::try_from(self.duration.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(last_fetched) < duration_ms
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DURATION)
    }
}

#[derive(Clone)]
pub enum CacheStore {
    Available(Arc<dyn Storage>),
    Unavailable,
}

impl CacheStore {
    /// Writes and removes a sentinel key. Any failure yields `Unavailable`.
    pub async fn probe(storage: Arc<dyn Storage>) -> Self {
        let res = with_store_blocking(storage.clone(), |s| {
            s.put(PROBE_KEY, PROBE_KEY)?;
            s.delete(PROBE_KEY)
        })
        .await;

        match res {
            Ok(Ok(())) => CacheStore::Available(storage),
            Ok(Err(e)) => {
                warn!(error = %e, "cache store is not available");
                CacheStore::Unavailable
            }
            Err(e) => {
                warn!(error = %e, "cache probe task failed");
                CacheStore::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CacheStore::Available(_))
    }

    pub async fn try_read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let CacheStore::Available(storage) = self else {
            return Err(CacheError::Unavailable);
        };
        let key = key.to_string();
        Ok(with_store_blocking(storage.clone(), move |s| s.get(&key)).await??)
    }

    pub async fn try_write(&self, key: &str, value: String) -> Result<(), CacheError> {
        let CacheStore::Available(storage) = self else {
            return Err(CacheError::Unavailable);
        };
        let key = key.to_string();
        Ok(with_store_blocking(storage.clone(), move |s| s.put(&key, &value)).await??)
    }

    pub async fn read(&self, key: &str) -> Option<String> {
        match self.try_read(key).await {
            Ok(v) => v,
            Err(CacheError::Unavailable) => None,
            Err(e) => {
                error!(key, error = %e, "error reading cache");
                None
            }
        }
    }

    pub async fn write(&self, key: &str, value: String) {
        match self.try_write(key, value).await {
            Ok(()) | Err(CacheError::Unavailable) => {}
            Err(e) => error!(key, error = %e, "error writing cache"),
        }
    }

    /// Decoded entry under `key`; a malformed value counts as a miss.
    pub async fn read_entry<T: CacheEntry>(&self, key: &str) -> Option<T> {
        let raw = self.read(key).await?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, error = %e, "discarding malformed cache entry");
                None
            }
        }
    }

    pub async fn write_entry<T: CacheEntry>(&self, key: &str, entry: &T) {
        match serde_json::to_string(entry) {
            Ok(raw) => {
                self.write(key, raw).await;
                debug!(key, "cache entry written");
            }
            Err(e) => error!(key, error = %e, "could not encode cache entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvstore::{FileBackedStorage, InMemoryStorage, UnreachableStorage};

    const T: Millis = 1_700_000_000_000;

    #[test]
    fn test_freshness_boundary() {
        let policy = CachePolicy::default();
        let d = DEFAULT_CACHE_DURATION.as_millis() as i64;
        assert!(policy.is_fresh(T, T));
        assert!(policy.is_fresh(T, T + d - 1));
        assert!(!policy.is_fresh(T, T + d));
    }

    #[test]
    fn test_out_of_range_timestamps_are_stale() {
        let policy = CachePolicy::default();
        assert!(!policy.is_fresh(i64::MIN, T));
        assert!(!policy.is_fresh(T + 1, T));
        assert!(!policy.is_fresh(i64::MAX, T));
    }

    #[test]
    fn test_disabled_policy_is_never_fresh() {
        let policy = CachePolicy::disabled();
        assert!(!policy.is_enabled());
        assert!(!policy.is_fresh(T, T));
    }

    #[tokio::test]
    async fn test_probe_classifies_stores() {
        let ok = CacheStore::probe(Arc::new(InMemoryStorage::new())).await;
        assert!(ok.is_available());

        let bad = CacheStore::probe(Arc::new(UnreachableStorage)).await;
        assert!(!bad.is_available());
    }

    #[tokio::test]
    async fn test_probe_leaves_no_sentinel() {
        let storage = InMemoryStorage::new();
        let _ = CacheStore::probe(Arc::new(storage.clone())).await;
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_reads_none_and_writes_nothing() {
        let cache = CacheStore::Unavailable;
        cache.write(MESH_STORAGE_KEY, "x".into()).await;
        assert_eq!(cache.read(MESH_STORAGE_KEY).await, None);
        assert!(matches!(
            cache.try_read(MESH_STORAGE_KEY).await,
            Err(CacheError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_storage_errors_are_absorbed() {
        // available at probe time, failing afterwards
        let cache = CacheStore::Available(Arc::new(UnreachableStorage));
        cache.write(MESH_STORAGE_KEY, "x".into()).await;
        assert_eq!(cache.read(MESH_STORAGE_KEY).await, None);
        assert!(matches!(
            cache.try_write(MESH_STORAGE_KEY, "x".into()).await,
            Err(CacheError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_entry_round_trip_and_malformed_miss() {
        let cache = CacheStore::probe(Arc::new(InMemoryStorage::new())).await;
        let snap = CatalystSnapshot {
            last_fetched: T,
            ..Default::default()
        };
        cache.write_entry(CATALYST_STORAGE_KEY, &snap).await;
        let back: CatalystSnapshot = cache.read_entry(CATALYST_STORAGE_KEY).await.unwrap();
        assert_eq!(back.last_fetched(), T);

        cache.write(MESH_STORAGE_KEY, "{\"votes\": 7}".into()).await;
        assert!(cache.read_entry::<MeshData>(MESH_STORAGE_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_file_backed_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = CacheStore::probe(Arc::new(FileBackedStorage::new(&path).unwrap())).await;
        cache.write(CATALYST_STORAGE_KEY, "{}".into()).await;

        let reopened = CacheStore::probe(Arc::new(FileBackedStorage::new(&path).unwrap())).await;
        assert_eq!(reopened.read(CATALYST_STORAGE_KEY).await.as_deref(), Some("{}"));
    }
}
