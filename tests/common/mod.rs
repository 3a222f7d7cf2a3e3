//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use inventory_cache::{CacheError, CacheValue, KeyValueStore, ManualClock, MemoryStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const START: i64 = 1_700_000_000;

pub fn memory_store() -> (Arc<MemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_unix(START));
    (Arc::new(MemoryStore::new(clock.clone())), clock)
}

/// Wraps a memory store and fails every command while `down` is set
pub struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            inner: MemoryStore::new(clock),
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::ConnectionError("store unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        self.check()?;
        self.inner.increment(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.expire(key, ttl).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}
