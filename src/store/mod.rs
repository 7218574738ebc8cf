//! Primitive key/value, list and set operations against the backing store.
//!
//! Every operation answers with a [`StoreReply`], which keeps three outcomes
//! apart: a value, an empty reply (missing key, nil pop) and a failure. Callers
//! higher up usually collapse the first two into "nothing there", but the
//! distinction is kept here so diagnostics can tell an absent entity from a
//! store that could not be reached.

use crate::{RedworkError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{trace, warn};

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Outcome of a single store operation.
#[derive(Debug)]
pub enum StoreReply<T> {
    /// The operation succeeded and produced a value
    Value(T),
    /// The operation succeeded but there was nothing to return
    Empty,
    /// The operation itself failed
    Failed(RedworkError),
}

impl<T> StoreReply<T> {
    /// Classify a raw Redis reply, logging empty and failed outcomes at
    /// different levels.
    pub fn from_redis(op: &str, key: &str, result: ::redis::RedisResult<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => StoreReply::Value(value),
            Ok(None) => {
                trace!(op, key, "store reply is empty");
                StoreReply::Empty
            }
            Err(e) => Self::failed(op, key, e.into()),
        }
    }

    /// Build a failed reply, logging the cause.
    pub fn failed(op: &str, key: &str, error: RedworkError) -> Self {
        warn!(op, key, error = %error, "store operation failed");
        StoreReply::Failed(error)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, StoreReply::Value(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StoreReply::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StoreReply::Failed(_))
    }

    /// The value, if there was one. Empty and failed replies both yield `None`.
    pub fn ok(self) -> Option<T> {
        match self {
            StoreReply::Value(value) => Some(value),
            StoreReply::Empty | StoreReply::Failed(_) => None,
        }
    }

    /// Keep the empty/value distinction but surface failures as errors.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            StoreReply::Value(value) => Ok(Some(value)),
            StoreReply::Empty => Ok(None),
            StoreReply::Failed(e) => Err(e),
        }
    }

    pub fn map<U, F>(self, f: F) -> StoreReply<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            StoreReply::Value(value) => StoreReply::Value(f(value)),
            StoreReply::Empty => StoreReply::Empty,
            StoreReply::Failed(e) => StoreReply::Failed(e),
        }
    }
}

impl<T: Default> StoreReply<T> {
    /// Treat an empty reply as the zero value of `T`.
    pub fn into_result_or_default(self) -> Result<T> {
        self.into_result().map(Option::unwrap_or_default)
    }
}

/// Primitive operations the queue topology is built from.
///
/// Counts and lengths of missing keys are reported as `Value(0)` (as Redis
/// does); `Empty` is reserved for nil replies.
#[async_trait]
pub trait Store: Send + Sync {
    // Strings
    async fn get(&self, key: &str) -> StoreReply<String>;
    async fn set(&self, key: &str, value: &str, expiration: Option<Duration>) -> StoreReply<()>;
    async fn del(&self, key: &str) -> StoreReply<u64>;
    /// Remaining time to live. Empty when the key is missing or never expires.
    async fn ttl(&self, key: &str) -> StoreReply<Duration>;

    // Lists
    async fn lpush(&self, key: &str, value: &str) -> StoreReply<()>;
    async fn llen(&self, key: &str) -> StoreReply<u64>;
    async fn lrem(&self, key: &str, count: i64, value: &str) -> StoreReply<u64>;
    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> StoreReply<()>;
    async fn rpoplpush(&self, source: &str, destination: &str) -> StoreReply<String>;

    // Sets
    async fn sadd(&self, key: &str, value: &str) -> StoreReply<()>;
    async fn smembers(&self, key: &str) -> StoreReply<Vec<String>>;
    async fn srem(&self, key: &str, value: &str) -> StoreReply<u64>;

    async fn flush_db(&self) -> StoreReply<()>;
}
