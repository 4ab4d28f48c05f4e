//! Shared engine state behind an injected key-value store.
//!
//! Prompt wish-lists survive across requests and across worker processes;
//! everything else in the engine is request-scoped. The trait is
//! intentionally synchronous: resolution runs on whatever thread the
//! transport hands it, and the backend provides atomic get/set per key.

mod inmemory;
#[cfg(feature = "redis-backend")]
mod redis;

pub use inmemory::InMemoryStateStore;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisStateStore;

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Backend-agnostic key-value state with per-key expiry.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Set a value; `ttl` of `None` applies the backend default.
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;
}

/// No-op store used when shared state is not configured. Prompts read as
/// absent and writes vanish; resolution still works, minus rotation.
#[derive(Debug)]
pub struct NoOpStateStore;

impl StateStore for NoOpStateStore {
    fn get(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// Create a StateStore from configuration.
pub fn create_state_store(config: &crate::config::StateConfig) -> Result<Arc<dyn StateStore>> {
    match config.backend.as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory StateStore (ttl={}s)", config.ttl_seconds);
            Ok(Arc::new(InMemoryStateStore::new(config.ttl_seconds)))
        }
        "redis" => {
            let redis_config = config
                .redis
                .as_ref()
                .ok_or_else(|| anyhow!("Redis backend selected but no redis config provided"))?;

            #[cfg(feature = "redis-backend")]
            {
                use anyhow::Context;

                let store = RedisStateStore::new(
                    &redis_config.url,
                    redis_config.pool_size,
                    redis_config.key_prefix.clone(),
                    config.ttl_seconds,
                )
                .context("Failed to create Redis backend")?;

                tracing::info!(
                    "Using redis StateStore (url={}, ttl={}s)",
                    redis_config.url,
                    config.ttl_seconds
                );

                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "redis-backend"))]
            {
                let _ = redis_config;
                Err(anyhow!(
                    "Redis backend not available. Compile with --features redis-backend"
                ))
            }
        }
        other => Err(anyhow!("Unknown state backend: {other}")),
    }
}
