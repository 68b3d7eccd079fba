//! Redis cache backend
//!
//! Expiry is delegated to Redis: every write is a `SETEX` with the
//! configured time-to-live.

use crate::cache::{CacheError, CacheResult};
use redis::aio::MultiplexedConnection;
use redis::Cmd;
use std::time::Duration;

/// Upper bound on connecting to Redis and answering the liveness probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Networked cache backed by a multiplexed Redis connection
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connects and verifies the server answers `PING`
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection string (`redis://host:port/db`)
    /// * `ttl_secs` - Expiry applied to every write
    ///
    /// # Returns
    ///
    /// * `Ok(RedisCache)` - The server is reachable
    /// * `Err(CacheError)` - Bad URL, unreachable server, or failed probe
    pub async fn connect(url: &str, ttl_secs: u64) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;

        let mut conn = tokio::time::timeout(PROBE_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Unavailable(format!("connecting to {} timed out", url)))??;

        let pong: String = tokio::time::timeout(
            PROBE_TIMEOUT,
            redis::cmd("PING").query_async::<_, String>(&mut conn),
        )
        .await
        .map_err(|_| CacheError::Unavailable(format!("PING to {} timed out", url)))??;

        if pong != "PONG" {
            return Err(CacheError::Unavailable(format!(
                "unexpected PING reply from {}: {}",
                url, pong
            )));
        }

        Ok(Self { conn, ttl_secs })
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = get_command(key).query_async(&mut conn).await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        set_command(key, value, self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

fn get_command(key: &str) -> Cmd {
    let mut cmd = redis::cmd("GET");
    cmd.arg(key);
    cmd
}

/// `SETEX key ttl value`; every write refreshes the expiry
fn set_command(key: &str, value: &str, ttl_secs: u64) -> Cmd {
    let mut cmd = redis::cmd("SETEX");
    cmd.arg(key).arg(ttl_secs).arg(value);
    cmd
}
