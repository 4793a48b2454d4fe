//! Key-value store backends.
//!
//! All cross-request state (live codes, rate counters) lives behind the
//! [`KeyValueStore`] trait. Components receive an `Arc<dyn KeyValueStore>`
//! at construction; there is no process-global client.

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use async_trait::async_trait;
use otp_common::OtpError;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;

/// URL scheme selecting the in-process backend
pub const MEMORY_SCHEME: &str = "memory://";

/// Minimal store surface the OTP flows need.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short backend name for health output ("redis", "memory")
    fn backend(&self) -> &'static str;

    /// Fetch a live value
    async fn get(&self, key: &str) -> Result<Option<String>, OtpError>;

    /// Set a value with a time-to-live, replacing any previous value
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError>;

    /// Remove a key. Returns true if a live key was removed.
    async fn delete(&self, key: &str) -> Result<bool, OtpError>;

    /// Atomically bump a counter unless it has reached `limit`.
    ///
    /// Returns `None` (without incrementing) when the counter is already
    /// at or above `limit`, otherwise the new count. `window` becomes the
    /// counter's TTL only when this call created it.
    async fn increment_bounded(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<Option<u64>, OtpError>;

    /// Round-trip connectivity check
    async fn ping(&self) -> Result<(), OtpError>;
}

/// Open the backend named by `url` and verify it answers a ping.
pub async fn connect(url: &str, config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, OtpError> {
    let store: Arc<dyn KeyValueStore> = if url.starts_with(MEMORY_SCHEME) {
        let store = Arc::new(MemoryStore::new());
        tokio::spawn(memory::sweeper(
            Arc::downgrade(&store),
            Duration::from_secs(config.sweep_interval_secs),
        ));
        tracing::warn!("Using in-process memory store; state is not shared between instances");
        store
    } else {
        Arc::new(RedisStore::connect(url, config).await?)
    };

    store.ping().await?;
    Ok(store)
}
