//! In-memory implementation of [`Store`] for tests and local development.
//!
//! `MemoryStore` follows Redis semantics closely enough to back a
//! [`RedisTopology`](crate::topology::RedisTopology) without a server:
//!
//! - lists push on the left and pop on the right
//! - empty lists and sets disappear, like their Redis counterparts
//! - set members come back in insertion order, which keeps test output stable
//!
//! Individual keys can be marked as failing to exercise the error paths of
//! callers.
//!
//! # Examples
//!
//! ```rust
//! use redwork::store::{MemoryStore, Store};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryStore::new();
//! store.lpush("jobs", "a").await;
//! store.lpush("jobs", "b").await;
//! assert_eq!(store.llen("jobs").await.ok(), Some(2));
//!
//! store.fail_key("jobs").await;
//! assert!(store.llen("jobs").await.is_failed());
//! # }
//! ```

use super::{Store, StoreReply};
use crate::RedworkError;
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryData {
    strings: HashMap<String, (String, Option<Instant>)>,
    lists: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, Vec<String>>,
}

impl MemoryData {
    fn live_string(&mut self, key: &str) -> Option<&(String, Option<Instant>)> {
        let expired = matches!(
            self.strings.get(key),
            Some((_, Some(deadline))) if *deadline <= Instant::now()
        );
        if expired {
            self.strings.remove(key);
        }
        self.strings.get(key)
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
    failing_keys: Arc<RwLock<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation touching `key` fail until [`heal_key`](Self::heal_key).
    pub async fn fail_key(&self, key: &str) {
        self.failing_keys.write().await.insert(key.to_string());
    }

    pub async fn heal_key(&self, key: &str) {
        self.failing_keys.write().await.remove(key);
    }

    async fn check<T>(&self, op: &str, key: &str) -> Option<StoreReply<T>> {
        if self.failing_keys.read().await.contains(key) {
            let error = RedworkError::Store {
                message: format!("injected failure for {} on {}", op, key),
            };
            return Some(StoreReply::failed(op, key, error));
        }
        None
    }
}

/// Resolve Redis-style inclusive, possibly negative, range bounds.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreReply<String> {
        if let Some(failed) = self.check("GET", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        match data.live_string(key) {
            Some((value, _)) => StoreReply::Value(value.clone()),
            None => StoreReply::Empty,
        }
    }

    async fn set(&self, key: &str, value: &str, expiration: Option<Duration>) -> StoreReply<()> {
        if let Some(failed) = self.check("SET", key).await {
            return failed;
        }
        let deadline = expiration.map(|ttl| Instant::now() + ttl);
        let mut data = self.data.write().await;
        data.strings
            .insert(key.to_string(), (value.to_string(), deadline));
        StoreReply::Value(())
    }

    async fn del(&self, key: &str) -> StoreReply<u64> {
        if let Some(failed) = self.check("DEL", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        let removed = data.live_string(key).is_some() as u64;
        data.strings.remove(key);
        let removed = removed
            + data.lists.remove(key).is_some() as u64
            + data.sets.remove(key).is_some() as u64;
        StoreReply::Value(removed)
    }

    async fn ttl(&self, key: &str) -> StoreReply<Duration> {
        if let Some(failed) = self.check("TTL", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        match data.live_string(key) {
            Some((_, Some(deadline))) => {
                StoreReply::Value(deadline.saturating_duration_since(Instant::now()))
            }
            _ => StoreReply::Empty,
        }
    }

    async fn lpush(&self, key: &str, value: &str) -> StoreReply<()> {
        if let Some(failed) = self.check("LPUSH", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        data.lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        StoreReply::Value(())
    }

    async fn llen(&self, key: &str) -> StoreReply<u64> {
        if let Some(failed) = self.check("LLEN", key).await {
            return failed;
        }
        let data = self.data.read().await;
        StoreReply::Value(data.lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn lrem(&self, key: &str, count: i64, value: &str) -> StoreReply<u64> {
        if let Some(failed) = self.check("LREM", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        let Some(list) = data.lists.get_mut(key) else {
            return StoreReply::Value(0);
        };

        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs() as usize
        };
        let mut removed = 0;
        if count >= 0 {
            let mut index = 0;
            while index < list.len() && removed < limit {
                if list[index] == value {
                    list.remove(index);
                    removed += 1;
                } else {
                    index += 1;
                }
            }
        } else {
            let mut index = list.len();
            while index > 0 && removed < limit {
                index -= 1;
                if list[index] == value {
                    list.remove(index);
                    removed += 1;
                }
            }
        }

        if list.is_empty() {
            data.lists.remove(key);
        }
        StoreReply::Value(removed as u64)
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> StoreReply<()> {
        if let Some(failed) = self.check("LTRIM", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        if let Some(list) = data.lists.get_mut(key) {
            match resolve_range(list.len(), start, stop) {
                Some((start, stop)) => {
                    list.truncate(stop + 1);
                    list.drain(..start);
                }
                None => list.clear(),
            }
            if list.is_empty() {
                data.lists.remove(key);
            }
        }
        StoreReply::Value(())
    }

    async fn rpoplpush(&self, source: &str, destination: &str) -> StoreReply<String> {
        if let Some(failed) = self.check("RPOPLPUSH", source).await {
            return failed;
        }
        if let Some(failed) = self.check("RPOPLPUSH", destination).await {
            return failed;
        }
        let mut data = self.data.write().await;
        let popped = data.lists.get_mut(source).and_then(VecDeque::pop_back);
        let Some(value) = popped else {
            return StoreReply::Empty;
        };
        if data.lists.get(source).is_some_and(VecDeque::is_empty) {
            data.lists.remove(source);
        }
        data.lists
            .entry(destination.to_string())
            .or_default()
            .push_front(value.clone());
        StoreReply::Value(value)
    }

    async fn sadd(&self, key: &str, value: &str) -> StoreReply<()> {
        if let Some(failed) = self.check("SADD", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        let members = data.sets.entry(key.to_string()).or_default();
        if !members.iter().any(|member| member == value) {
            members.push(value.to_string());
        }
        StoreReply::Value(())
    }

    async fn smembers(&self, key: &str) -> StoreReply<Vec<String>> {
        if let Some(failed) = self.check("SMEMBERS", key).await {
            return failed;
        }
        let data = self.data.read().await;
        StoreReply::Value(data.sets.get(key).cloned().unwrap_or_default())
    }

    async fn srem(&self, key: &str, value: &str) -> StoreReply<u64> {
        if let Some(failed) = self.check("SREM", key).await {
            return failed;
        }
        let mut data = self.data.write().await;
        let Some(members) = data.sets.get_mut(key) else {
            return StoreReply::Value(0);
        };
        let before = members.len();
        members.retain(|member| member != value);
        let removed = (before - members.len()) as u64;
        if members.is_empty() {
            data.sets.remove(key);
        }
        StoreReply::Value(removed)
    }

    async fn flush_db(&self) -> StoreReply<()> {
        let mut data = self.data.write().await;
        *data = MemoryData::default();
        StoreReply::Value(())
    }
}
