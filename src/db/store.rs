use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use redis::AsyncCommands;

use crate::error::AppResult;

/// The shared key-value store backing both the response cache and the
/// per-provider rate-limit counters. Values expire by TTL only; nothing is
/// ever explicitly invalidated.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> AppResult<()>;

    /// Atomically increments the counter at `key` and returns the new count.
    /// The first increment in a fresh window sets the window expiry in the
    /// same atomic step, so a counter can never outlive its window.
    async fn incr_ex(&self, key: &str, window_seconds: u64) -> AppResult<u64>;
}

/// INCR and EXPIRE must land together: two racing first-increments would
/// otherwise leave a counter with no expiry.
const INCR_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Redis-backed store used in production
pub struct RedisStore {
    client: redis::Client,
    incr_script: redis::Script,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            incr_script: redis::Script::new(INCR_WINDOW_SCRIPT),
        })
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn incr_ex(&self, key: &str, window_seconds: u64) -> AppResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: u64 = self
            .incr_script
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }
}

struct StoredEntry {
    value: String,
    expires_at: Instant,
}

/// In-process store for tests and local development without Redis.
/// Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let Ok(mut entries) = self.entries.lock() else {
            return Ok(None);
        };
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> AppResult<()> {
        let Ok(mut entries) = self.entries.lock() else {
            return Ok(());
        };
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn incr_ex(&self, key: &str, window_seconds: u64) -> AppResult<u64> {
        let Ok(mut entries) = self.entries.lock() else {
            return Ok(0);
        };
        let now = Instant::now();
        let count = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                entry.value.parse::<u64>().unwrap_or(0) + 1
            }
            _ => 1,
        };
        let expires_at = match entries.get(key) {
            // Window expiry is set on the first increment only
            Some(entry) if entry.expires_at > now && count > 1 => entry.expires_at,
            _ => now + Duration::from_secs(window_seconds),
        };
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }
}
