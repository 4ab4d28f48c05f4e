//! Redis StateStore using a synchronous blocking client with r2d2 pooling.
//!
//! Kept synchronous on purpose: the resolution path has no async runtime,
//! and per-key atomicity comes from Redis itself, which is what lets
//! independent worker processes share one prompt wish-list.

use super::StateStore;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use redis::{Commands, Connection};
use serde_json::Value;
use std::time::Duration;

struct RedisConnectionManager {
    client: redis::Client,
}

impl RedisConnectionManager {
    fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

impl r2d2::ManageConnection for RedisConnectionManager {
    type Connection = Mutex<Connection>;
    type Error = redis::RedisError;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let conn = self.client.get_connection()?;
        Ok(Mutex::new(conn))
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        redis::cmd("PING").query(conn.get_mut())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub struct RedisStateStore {
    pool: r2d2::Pool<RedisConnectionManager>,
    key_prefix: String,
    default_ttl_seconds: u64,
}

impl RedisStateStore {
    /// Connect and verify with a PING.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g. "redis://localhost:6379")
    /// * `pool_size` - Connection pool size
    /// * `key_prefix` - Prefix for all keys (e.g. "decoy:")
    /// * `default_ttl_seconds` - TTL applied when a write names none
    pub fn new(
        url: &str,
        pool_size: usize,
        key_prefix: String,
        default_ttl_seconds: u64,
    ) -> Result<Self> {
        let client = redis::Client::open(url).context("Failed to parse Redis URL")?;

        let manager = RedisConnectionManager::new(client);

        let pool = r2d2::Pool::builder()
            .max_size(pool_size as u32)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .context("Failed to create Redis connection pool")?;

        {
            let conn = pool.get().context("Failed to get connection from pool")?;
            let _: String = redis::cmd("PING")
                .query(&mut *conn.lock())
                .context("Failed to PING Redis")?;
        }

        tracing::info!(
            "Connected to Redis with prefix={}, ttl={}s, pool_size={}",
            key_prefix,
            default_ttl_seconds,
            pool_size
        );

        Ok(Self {
            pool,
            key_prefix,
            default_ttl_seconds,
        })
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

impl StateStore for RedisStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = self.make_key(key);
        let conn = self
            .pool
            .get()
            .context("Failed to get Redis connection from pool")?;

        let value: Option<String> = conn.lock().get(&key).context("Redis GET failed")?;

        match value {
            Some(json_str) => {
                let value =
                    serde_json::from_str(&json_str).context("Failed to parse JSON from Redis")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let key = self.make_key(key);
        let json_str = serde_json::to_string(&value).context("Failed to serialize value")?;
        let ttl_seconds = ttl
            .map(|t| t.as_secs())
            .unwrap_or(self.default_ttl_seconds)
            .max(1);

        let conn = self
            .pool
            .get()
            .context("Failed to get Redis connection from pool")?;

        let _: () = redis::cmd("SETEX")
            .arg(&key)
            .arg(ttl_seconds)
            .arg(json_str)
            .query(&mut *conn.lock())
            .context("Redis SETEX failed")?;

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let key = self.make_key(key);
        let conn = self
            .pool
            .get()
            .context("Failed to get Redis connection from pool")?;

        let _: () = conn.lock().del(&key).context("Redis DEL failed")?;

        Ok(())
    }
}
