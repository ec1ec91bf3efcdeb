//! Store doubles shared by unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{KvError, KvStore, MemoryStore};

/// Memory store without key enumeration, counting deletes
#[derive(Debug, Default)]
pub struct SweepOnlyStore {
    pub inner: MemoryStore,
    pub deletes: AtomicUsize,
}

#[async_trait]
impl KvStore for SweepOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.del(key).await
    }
}

/// Memory store that can be switched into a failing state
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub down: AtomicBool,
}

impl FlakyStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), KvError> {
        if self.down.load(Ordering::SeqCst) {
            Err(KvError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.check()?;
        self.inner.del(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Option<Vec<String>>, KvError> {
        self.check()?;
        self.inner.scan_prefix(prefix).await
    }
}

/// Memory store whose writes take `delay` to land
#[derive(Debug, Default)]
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl KvStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.inner.del(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Option<Vec<String>>, KvError> {
        self.inner.scan_prefix(prefix).await
    }
}
