//! Redis-backed implementation of [`Store`].

use super::{Store, StoreReply};
use crate::Result;
use ::redis::{AsyncCommands, aio::MultiplexedConnection};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A [`Store`] talking to a Redis server over a multiplexed connection.
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Open a multiplexed connection to the server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ::redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!("Connected to Redis at {}", url);
        Ok(Self::with_connection(conn))
    }

    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

/// Redis rejects `PX 0`, so sub-millisecond expirations round up.
fn expiration_millis(expiration: Duration) -> u64 {
    u64::try_from(expiration.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreReply<String> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis("GET", key, conn.get(key).await)
    }

    async fn set(&self, key: &str, value: &str, expiration: Option<Duration>) -> StoreReply<()> {
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(expiration) = expiration {
            cmd.arg("PX").arg(expiration_millis(expiration));
        }
        StoreReply::from_redis("SET", key, cmd.query_async(&mut conn).await)
    }

    async fn del(&self, key: &str) -> StoreReply<u64> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis("DEL", key, conn.del(key).await)
    }

    async fn ttl(&self, key: &str) -> StoreReply<Duration> {
        let mut conn = self.conn.clone();
        let reply: StoreReply<i64> = StoreReply::from_redis("TTL", key, conn.ttl(key).await);
        match reply {
            // -2: no such key, -1: key without expiry
            StoreReply::Value(secs) if secs < 0 => StoreReply::Empty,
            other => other.map(|secs| Duration::from_secs(secs as u64)),
        }
    }

    async fn lpush(&self, key: &str, value: &str) -> StoreReply<()> {
        let mut conn = self.conn.clone();
        let reply: StoreReply<u64> = StoreReply::from_redis("LPUSH", key, conn.lpush(key, value).await);
        reply.map(|_| ())
    }

    async fn llen(&self, key: &str) -> StoreReply<u64> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis("LLEN", key, conn.llen(key).await)
    }

    async fn lrem(&self, key: &str, count: i64, value: &str) -> StoreReply<u64> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis("LREM", key, conn.lrem(key, count as isize, value).await)
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> StoreReply<()> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis(
            "LTRIM",
            key,
            conn.ltrim(key, start as isize, stop as isize).await,
        )
    }

    async fn rpoplpush(&self, source: &str, destination: &str) -> StoreReply<String> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis(
            "RPOPLPUSH",
            source,
            conn.rpoplpush(source, destination).await,
        )
    }

    async fn sadd(&self, key: &str, value: &str) -> StoreReply<()> {
        let mut conn = self.conn.clone();
        let reply: StoreReply<u64> = StoreReply::from_redis("SADD", key, conn.sadd(key, value).await);
        reply.map(|_| ())
    }

    async fn smembers(&self, key: &str) -> StoreReply<Vec<String>> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis("SMEMBERS", key, conn.smembers(key).await)
    }

    async fn srem(&self, key: &str, value: &str) -> StoreReply<u64> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis("SREM", key, conn.srem(key, value).await)
    }

    async fn flush_db(&self) -> StoreReply<()> {
        let mut conn = self.conn.clone();
        StoreReply::from_redis(
            "FLUSHDB",
            "*",
            ::redis::cmd("FLUSHDB").query_async(&mut conn).await,
        )
    }
}
