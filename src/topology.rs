//! Read-only view of the live queue topology.
//!
//! Queues and connections are created, closed and hijacked by other processes
//! at any time, so every answer here is a point-in-time value that may already
//! be stale when it is used. Absent entities come back as empty or zero values;
//! `Err` is reserved for failures of the backing store itself.

use crate::{
    Result,
    keys::KeyLayout,
    store::{Store, StoreReply},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Capability interface the statistics collector walks.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Names of all open queues
    async fn open_queues(&self) -> Result<Vec<String>>;

    /// Handle for reading a queue's own state
    async fn open_queue(&self, queue_name: &str) -> Result<Box<dyn QueueHandle>>;

    /// Names of all registered connections, including stale ones
    async fn connections(&self) -> Result<Vec<String>>;

    /// Handle for reading a connection's state, regardless of which process
    /// owns it or whether it is still alive
    async fn hijack_connection(&self, connection_name: &str) -> Result<Box<dyn ConnectionHandle>>;
}

#[async_trait]
pub trait QueueHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Deliveries waiting in the queue
    async fn ready_count(&self) -> Result<u64>;
}

#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Names of the queues this connection consumes
    async fn consuming_queues(&self) -> Result<Vec<String>>;

    /// Consumer identifiers this connection registered against `queue_name`
    async fn consumers(&self, queue_name: &str) -> Result<Vec<String>>;

    /// Deliveries this connection holds for `queue_name` without acknowledgement
    async fn unacked_count(&self, queue_name: &str) -> Result<u64>;
}

/// Topology stored in Redis (or anything else implementing [`Store`]) using the
/// [`KeyLayout`] scheme.
pub struct RedisTopology<S: Store> {
    store: Arc<S>,
    keys: KeyLayout,
}

impl<S: Store> Clone for RedisTopology<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            keys: self.keys.clone(),
        }
    }
}

impl<S: Store + 'static> RedisTopology<S> {
    pub fn new(store: S) -> Self {
        Self::with_keys(Arc::new(store), KeyLayout::default())
    }

    pub fn with_keys(store: Arc<S>, keys: KeyLayout) -> Self {
        Self { store, keys }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn keys(&self) -> &KeyLayout {
        &self.keys
    }
}

#[async_trait]
impl<S: Store + 'static> TopologyProvider for RedisTopology<S> {
    async fn open_queues(&self) -> Result<Vec<String>> {
        self.store
            .smembers(&self.keys.queues())
            .await
            .into_result_or_default()
    }

    async fn open_queue(&self, queue_name: &str) -> Result<Box<dyn QueueHandle>> {
        Ok(Box::new(RedisQueue {
            name: queue_name.to_string(),
            ready_key: self.keys.queue_ready(queue_name),
            store: self.store.clone(),
        }))
    }

    async fn connections(&self) -> Result<Vec<String>> {
        self.store
            .smembers(&self.keys.connections())
            .await
            .into_result_or_default()
    }

    async fn hijack_connection(&self, connection_name: &str) -> Result<Box<dyn ConnectionHandle>> {
        // Only informational; stale connections are still readable.
        let heartbeat = self
            .store
            .get(&self.keys.connection_heartbeat(connection_name))
            .await;
        if let StoreReply::Empty = heartbeat {
            debug!("Connection {} has no heartbeat, reading it anyway", connection_name);
        }

        Ok(Box::new(RedisConnection {
            name: connection_name.to_string(),
            keys: self.keys.clone(),
            store: self.store.clone(),
        }))
    }
}

struct RedisQueue<S: Store> {
    name: String,
    ready_key: String,
    store: Arc<S>,
}

#[async_trait]
impl<S: Store + 'static> QueueHandle for RedisQueue<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ready_count(&self) -> Result<u64> {
        self.store.llen(&self.ready_key).await.into_result_or_default()
    }
}

struct RedisConnection<S: Store> {
    name: String,
    keys: KeyLayout,
    store: Arc<S>,
}

#[async_trait]
impl<S: Store + 'static> ConnectionHandle for RedisConnection<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn consuming_queues(&self) -> Result<Vec<String>> {
        self.store
            .smembers(&self.keys.connection_queues(&self.name))
            .await
            .into_result_or_default()
    }

    async fn consumers(&self, queue_name: &str) -> Result<Vec<String>> {
        self.store
            .smembers(&self.keys.connection_queue_consumers(&self.name, queue_name))
            .await
            .into_result_or_default()
    }

    async fn unacked_count(&self, queue_name: &str) -> Result<u64> {
        self.store
            .llen(&self.keys.connection_queue_unacked(&self.name, queue_name))
            .await
            .into_result_or_default()
    }
}
