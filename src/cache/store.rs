use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// In-process expiring cache shared by all services
///
/// Values are stored as JSON so one cache can hold any serializable type.
/// Reading a key back as a type the stored value does not fit is a miss.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

/// Handle for stopping the background sweeper
pub struct CacheSweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl CacheSweeperHandle {
    /// Stops the sweeper after one final sweep
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache sweeper task failed");
        }
        tracing::info!("Cache sweeper stopped");
    }
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Failed to serialize value for cache");
                return;
            }
        };

        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().insert(key.to_string(), entry);
    }

    /// Returns the live value under `key`, dropping it if it has expired
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = {
            let mut entries = self.entries.lock();
            let now = Instant::now();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_expired(now) => {
                    entries.remove(key);
                    tracing::debug!(key = %key, "Cache entry expired");
                    return None;
                }
                Some(entry) => entry.value.clone(),
            }
        };

        match serde_json::from_value(value) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::debug!(error = %e, key = %key, "Cached value has a different shape");
                None
            }
        }
    }

    pub fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Removes every expired entry and returns how many were dropped
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns a task that sweeps the cache every `interval`
    pub fn spawn_sweeper(&self, interval: Duration) -> CacheSweeperHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let cache = self.clone();
        let task = tokio::spawn(async move {
            cache.sweeper_task(interval, shutdown_rx).await;
        });

        CacheSweeperHandle { shutdown_tx, task }
    }

    async fn sweeper_task(self, interval: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Cache sweeper started");
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Swept expired cache entries");
                    }
                }
                _ = shutdown_rx.recv() => {
                    let removed = self.sweep();
                    tracing::info!(removed, remaining = self.len(), "Final cache sweep");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        id: u64,
        score: f64,
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_before_and_after_expiry() {
        let cache = Cache::new();
        cache.set("k", &"v".to_string(), Duration::from_secs(60));

        assert_eq!(cache.get::<String>("k"), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(cache.get::<String>("k"), None);
        assert!(cache.is_empty(), "expired entry is removed on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_live_at_exact_deadline() {
        let cache = Cache::new();
        cache.set("k", &1u32, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get::<u32>("k"), Some(1));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = Cache::new();
        cache.set("k", &1u32, Duration::from_secs(60));
        cache.set("k", &2u32, Duration::from_secs(60));

        assert_eq!(cache.get::<u32>("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_structured_value_round_trip() {
        let cache = Cache::new();
        let payload = Payload {
            id: 550,
            score: 0.1 + 0.2,
        };
        cache.set("payload", &payload, Duration::from_secs(60));

        assert_eq!(cache.get::<Payload>("payload"), Some(payload));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_miss() {
        let cache = Cache::new();
        cache.set("k", &"not a payload", Duration::from_secs(60));

        assert_eq!(cache.get::<Payload>("k"), None);
        assert_eq!(cache.get::<String>("k"), Some("not a payload".to_string()));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = Cache::new();
        cache.set("a", &1u32, Duration::from_secs(60));
        cache.set("b", &2u32, Duration::from_secs(60));

        cache.delete("a");
        cache.delete("a");
        assert_eq!(cache.get::<u32>("a"), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_counts_expired() {
        let cache = Cache::new();
        cache.set("short", &1u32, Duration::from_secs(5));
        cache.set("long", &2u32, Duration::from_secs(500));

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u32>("long"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_on_interval_and_shutdown() {
        let cache = Cache::new();
        let handle = cache.spawn_sweeper(Duration::from_secs(30));

        cache.set("a", &1u32, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(cache.is_empty());

        cache.set("b", &2u32, Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;
        handle.shutdown().await;
        assert!(cache.is_empty());
    }
}
