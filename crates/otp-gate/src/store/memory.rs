//! In-process store for development and tests.
//!
//! Expiry uses `tokio::time::Instant`, so tests running on a paused clock
//! can move past TTLs with `tokio::time::advance`.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use otp_common::OtpError;
use std::sync::Weak;
use std::time::Duration;
use tokio::time::Instant;

use super::KeyValueStore;

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Instant,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// `DashMap`-backed store with lazy per-key expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Slot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Remaining lifetime of a live key
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|slot| !slot.is_expired(now))
            .map(|slot| slot.expires_at - now)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(slot) if !slot.is_expired(now) => return Ok(Some(slot.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }
        self.entries.remove_if(key, |_, slot| slot.is_expired(now));
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError> {
        self.entries.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, OtpError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }

    async fn increment_bounded(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<Option<u64>, OtpError> {
        let now = Instant::now();

        // The entry guard holds the shard lock, so read-check-write is atomic per key.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                let current: u64 = occupied.get().value.parse().map_err(|_| {
                    OtpError::Internal(format!("counter {key} holds a non-integer value"))
                })?;
                if current >= limit {
                    return Ok(None);
                }
                occupied.get_mut().value = (current + 1).to_string();
                Ok(Some(current + 1))
            }
            Entry::Occupied(mut occupied) => {
                if limit == 0 {
                    occupied.remove();
                    return Ok(None);
                }
                occupied.insert(Slot {
                    value: "1".to_string(),
                    expires_at: now + window,
                });
                Ok(Some(1))
            }
            Entry::Vacant(vacant) => {
                if limit == 0 {
                    return Ok(None);
                }
                vacant.insert(Slot {
                    value: "1".to_string(),
                    expires_at: now + window,
                });
                Ok(Some(1))
            }
        }
    }

    async fn ping(&self) -> Result<(), OtpError> {
        Ok(())
    }
}

/// Periodically purge expired entries until the store is dropped.
pub(super) async fn sweeper(store: Weak<MemoryStore>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(store) = store.upgrade() else {
            break;
        };
        let purged = store.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "Purged expired store entries");
        }
    }
}
