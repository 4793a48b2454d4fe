//! Redis-backed store.

use async_trait::async_trait;
use otp_common::OtpError;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Script};
use std::time::Duration;

use super::KeyValueStore;
use crate::config::StoreConfig;

/// Read, bump, and expire in one server-side step.
/// Returns -1 when the counter is already at the limit.
const BOUNDED_INCR_LUA: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current >= tonumber(ARGV[1]) then
    return -1
end
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return count
";

/// Store backed by a Redis connection manager (auto-reconnecting)
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    bounded_incr: Script,
}

impl RedisStore {
    /// Connect with finite connect and response timeouts
    pub async fn connect(url: &str, config: &StoreConfig) -> Result<Self, OtpError> {
        let client = redis::Client::open(url).map_err(unavailable)?;

        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(config.connect_timeout_secs))
            .set_response_timeout(Duration::from_secs(config.response_timeout_secs));

        let conn = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(unavailable)?;

        Ok(Self {
            conn,
            bounded_incr: Script::new(BOUNDED_INCR_LUA),
        })
    }
}

fn unavailable(err: redis::RedisError) -> OtpError {
    OtpError::StoreUnavailable(err.to_string())
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(unavailable)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, key: &str) -> Result<bool, OtpError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await.map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn increment_bounded(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
    ) -> Result<Option<u64>, OtpError> {
        let mut conn = self.conn.clone();
        let count: i64 = self
            .bounded_incr
            .key(key)
            .arg(limit)
            .arg(window.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(u64::try_from(count).ok())
    }

    async fn ping(&self) -> Result<(), OtpError> {
        let mut conn = self.conn.clone();
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.map(|_| ()).map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Needs a live server: REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_redis_bounded_increment() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let store = RedisStore::connect(&url, &StoreConfig::default()).await.unwrap();
        store.ping().await.unwrap();

        let key = format!("rate_limit:test:{}", rand::random::<u32>());
        let window = Duration::from_secs(30);
        assert_eq!(store.increment_bounded(&key, 2, window).await.unwrap(), Some(1));
        assert_eq!(store.increment_bounded(&key, 2, window).await.unwrap(), Some(2));
        assert_eq!(store.increment_bounded(&key, 2, window).await.unwrap(), None);
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("2"));

        assert!(store.delete(&key).await.unwrap());
        assert!(!store.delete(&key).await.unwrap());
    }
}
