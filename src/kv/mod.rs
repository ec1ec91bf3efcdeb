//! Ephemeral key-value storage with per-key expiry.
//!
//! Both the game cache and the rate-limit counters live here. Keys are plain
//! strings; values are opaque strings (JSON for cache entries, decimal
//! integers for counters).

mod memory;
#[cfg(test)]
pub mod testing;

pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("corrupt value stored under '{key}': {message}")]
    Corrupt { key: String, message: String },
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Store `value` under `key`, replacing any previous value and expiry
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError>;

    /// Remove `key`. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> Result<(), KvError>;

    /// Live keys starting with `prefix`, or `None` when the backend cannot
    /// enumerate its key space.
    async fn scan_prefix(&self, _prefix: &str) -> Result<Option<Vec<String>>, KvError> {
        Ok(None)
    }
}
