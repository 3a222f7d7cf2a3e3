//! In-process key-value store with TTL support
//!
//! Mirrors the semantics the cache layer relies on from the remote service:
//! lazy expiry, atomic INCR that keeps an existing TTL, EXPIRE as a no-op on
//! missing keys. Time comes from an injected [`Clock`] so expiry can be
//! driven by tests.

use crate::cache::types::{CacheKey, CacheValue};
use crate::clock::Clock;
use crate::error::{CacheError, Result};
use crate::store::{ttl_seconds, KeyValueStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A stored value and its optional expiry
#[derive(Debug, Clone)]
struct StoredEntry {
    value: CacheValue,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Expiry instant for `ttl` from `now`; `None` when it lies beyond what
/// chrono can represent, i.e. the entry never expires
fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(ttl_seconds(ttl)).ok()?;
    let delta = chrono::Duration::try_seconds(seconds)?;
    now.checked_add_signed(delta)
}

/// Key-value store held in process memory
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<CacheKey, StoredEntry>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Number of keys currently held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remaining lifetime of `key`, `None` when missing, expired or persistent
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        let expires_at = entry.expires_at?;
        (expires_at - now).to_std().ok()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Purged {} expired entries", removed);
        }
        removed
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at: expiry_from(now, ttl),
        };

        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let current = entry.value.parse::<i64>().map_err(|_| {
                    CacheError::StoreError(format!("value at {} is not an integer", key))
                })?;
                (current, entry.expires_at)
            }
            _ => (0, None),
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| CacheError::StoreError(format!("increment overflow at {}", key)))?;

        entries.insert(
            key.to_string(),
            StoredEntry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.expires_at = expiry_from(now, ttl);
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Background task that periodically purges expired entries
pub async fn start_auto_cleanup(store: Arc<MemoryStore>, interval: Duration) {
    info!("Starting memory store cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        let removed = store.purge_expired().await;
        if removed > 0 {
            debug!("Auto cleanup removed {} entries", removed);
        }
    }
}
