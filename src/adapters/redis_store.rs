//! Redis-backed counter store.
//!
//! The create-or-increment hot path runs as a single Lua script so the
//! counter creation (with its window TTL) and the increment are one atomic
//! operation on the Redis side — two separate commands would race between
//! concurrent requests from the same client and admit more than the limit.
//! Every round-trip is bounded by the configured store timeout.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::MultiplexedConnection};
use tokio::time::timeout;

use crate::ports::counter_store::{CounterStore, StoreError, StoreResult};

/// Increment the counter, stamping the window TTL only on creation.
const CREATE_OR_INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Counter store adapter over a shared Redis instance.
///
/// Cheap to clone; the multiplexed connection is shared and pipelined and
/// the script is compiled server-side once, then invoked by hash.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: MultiplexedConnection,
    create_or_increment: Arc<Script>,
    op_timeout: Duration,
}

impl RedisCounterStore {
    /// Connect to the store at `url`, bounding the connection attempt and
    /// every later operation by `op_timeout`.
    pub async fn connect(url: &str, op_timeout: Duration) -> StoreResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let connection = timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                StoreError::Unavailable(format!("connect to {url} timed out after {op_timeout:?}"))
            })?
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!("Connected to counter store at {url}");

        Ok(Self {
            connection,
            create_or_increment: Arc::new(Script::new(CREATE_OR_INCREMENT_SCRIPT)),
            op_timeout,
        })
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, redis::RedisError>>,
    ) -> StoreResult<T> {
        timeout(self.op_timeout, op)
            .await
            .map_err(|_| {
                StoreError::Unavailable(format!(
                    "store operation timed out after {:?}",
                    self.op_timeout
                ))
            })?
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn create_if_absent(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let ttl_ms = ttl.as_millis() as u64;

        let created: Option<String> = self
            .bounded(
                redis::cmd("SET")
                    .arg(key)
                    .arg(1)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async(&mut conn),
            )
            .await?;

        Ok(created.is_some())
    }

    async fn increment_and_get(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.connection.clone();
        self.bounded(conn.incr(key, 1)).await
    }

    async fn create_or_increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let mut conn = self.connection.clone();
        let ttl_ms = ttl.as_millis() as u64;

        let count: u64 = self
            .bounded(
                self.create_or_increment
                    .key(key)
                    .arg(ttl_ms)
                    .invoke_async(&mut conn),
            )
            .await?;

        Ok(count)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.connection.clone();
        self.bounded(conn.get(key)).await
    }
}
