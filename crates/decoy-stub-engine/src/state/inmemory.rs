//! In-memory StateStore for tests, development, and single-instance
//! deployments. Entries expire by wall clock; expired keys are cleaned up
//! opportunistically on write.

use super::StateStore;
use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

pub struct InMemoryStateStore {
    data: Mutex<HashMap<String, (Value, SystemTime)>>,
    default_ttl: Duration,
}

impl InMemoryStateStore {
    pub fn new(default_ttl_seconds: u64) -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }

    fn is_expired(expiry: &SystemTime) -> bool {
        SystemTime::now() > *expiry
    }
}

impl StateStore for InMemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let data = self.data.lock();
        match data.get(key) {
            Some((value, expiry)) if !Self::is_expired(expiry) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let expiry = SystemTime::now() + ttl.unwrap_or(self.default_ttl);
        let mut data = self.data.lock();

        // opportunistic cleanup of this key if it already expired
        if let Some((_, old_expiry)) = data.get(key) {
            if Self::is_expired(old_expiry) {
                data.remove(key);
            }
        }

        data.insert(key.to_string(), (value, expiry));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.lock().remove(key);
        Ok(())
    }
}
