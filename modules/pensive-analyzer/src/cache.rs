// In-process TTL cache for analysis results, keyed by content fingerprint.
//
// Entries are treated as absent once their deadline passes even if not yet
// physically evicted; writes sweep expired entries once the map grows.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use pensive_common::Analysis;

const SWEEP_THRESHOLD: usize = 1000;

struct CacheEntry {
    value: Analysis,
    expires_at: Instant,
}

#[derive(Default)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Analysis> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    pub async fn set(&self, key: String, value: Analysis, ttl: Duration) {
        let mut entries = self.entries.write().await;
        if entries.len() >= SWEEP_THRESHOLD {
            let now = Instant::now();
            entries.retain(|_, e| e.expires_at > now);
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
