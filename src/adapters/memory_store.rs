//! In-process counter store.
//!
//! Single-process stand-in for the shared store, used by tests and local
//! development. Atomicity comes from one mutex around the whole table;
//! expiry is checked lazily against the tokio clock, so paused-clock tests
//! can step through window boundaries deterministically.
use std::{collections::HashMap, sync::Mutex, time::Duration};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::ports::counter_store::{CounterStore, StoreResult};

struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

impl CounterEntry {
    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Counter store held in process memory.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<String, CounterEntry>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn create_if_absent(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut counters = self.counters.lock().expect("counter table lock");

        match counters.get(key) {
            Some(entry) if !entry.expired() => Ok(false),
            _ => {
                counters.insert(
                    key.to_string(),
                    CounterEntry {
                        count: 1,
                        expires_at: Instant::now() + ttl,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn increment_and_get(&self, key: &str) -> StoreResult<u64> {
        let mut counters = self.counters.lock().expect("counter table lock");

        match counters.get_mut(key) {
            Some(entry) if !entry.expired() => {
                entry.count += 1;
                Ok(entry.count)
            }
            // Redis INCR semantics: a missing key is created first, without
            // a TTL. The limiter never takes this path.
            _ => {
                counters.insert(
                    key.to_string(),
                    CounterEntry {
                        count: 1,
                        expires_at: Instant::now() + Duration::from_secs(365 * 24 * 3600),
                    },
                );
                Ok(1)
            }
        }
    }

    async fn create_or_increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let mut counters = self.counters.lock().expect("counter table lock");

        match counters.get_mut(key) {
            Some(entry) if !entry.expired() => {
                entry.count += 1;
                Ok(entry.count)
            }
            _ => {
                counters.insert(
                    key.to_string(),
                    CounterEntry {
                        count: 1,
                        expires_at: Instant::now() + ttl,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Option<u64>> {
        let mut counters = self.counters.lock().expect("counter table lock");

        match counters.get(key) {
            Some(entry) if !entry.expired() => Ok(Some(entry.count)),
            Some(_) => {
                // Lazy expiry: drop the stale entry on observation
                counters.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
