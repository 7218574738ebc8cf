//! Walks a [`TopologyProvider`] and assembles a [`QueueStats`] snapshot.
//!
//! Collection happens in two passes. The first records each open queue with its
//! ready count; the second hijacks every connection and attaches its consumers
//! and unacked count to the queues it consumes. Nothing locks the topology
//! between or during the passes, so the snapshot is an approximation of a
//! state that keeps changing underneath it.
//!
//! A failing lookup never aborts a run. It is logged and the affected entry is
//! left out or reported as empty, so one unreachable queue or connection does
//! not hide the rest.
//!
//! # Examples
//!
//! ```rust
//! use redwork::{collect_stats, store::{MemoryStore, Store}, topology::RedisTopology};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryStore::new();
//! store.sadd("rmq::queues", "orders").await;
//! store.lpush("rmq::queue::[orders]::ready", "job-1").await;
//!
//! let stats = collect_stats(&RedisTopology::new(store)).await;
//! assert_eq!(stats.get("orders").unwrap().ready_count, 1);
//! # }
//! ```

use crate::{
    RedworkError, Result,
    config::timeout_format,
    stats::{ConnectionStat, QueueStat, QueueStats},
    topology::TopologyProvider,
};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{Instrument, debug, debug_span, warn};

/// Collection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Maximum number of queues or connections looked up at the same time.
    /// `1` queries strictly one after another.
    pub concurrency: usize,

    /// Deadline for a whole collection run when using
    /// [`StatsCollector::collect_with_timeout`]. Zero disables the deadline.
    #[serde(with = "timeout_format")]
    pub collect_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            collect_timeout: Duration::from_secs(10),
        }
    }
}

impl CollectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_collect_timeout(mut self, timeout: Duration) -> Self {
        self.collect_timeout = timeout;
        self
    }
}

/// Collect a snapshot, querying the provider sequentially.
pub async fn collect_stats<P>(provider: &P) -> QueueStats
where
    P: TopologyProvider + ?Sized,
{
    collect_with(provider, 1).await
}

/// A provider paired with collection settings.
pub struct StatsCollector<P: ?Sized> {
    provider: Arc<P>,
    config: CollectorConfig,
}

impl<P: ?Sized> Clone for StatsCollector<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P> StatsCollector<P>
where
    P: TopologyProvider + ?Sized,
{
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_config(provider, CollectorConfig::default())
    }

    pub fn with_config(provider: Arc<P>, config: CollectorConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Produce a fresh snapshot.
    pub async fn collect(&self) -> QueueStats {
        collect_with(self.provider.as_ref(), self.config.concurrency).await
    }

    /// Produce a fresh snapshot, giving up once the configured deadline passes.
    /// A run that times out is discarded.
    pub async fn collect_with_timeout(&self) -> Result<QueueStats> {
        let deadline = self.config.collect_timeout;
        if deadline.is_zero() {
            return Ok(self.collect().await);
        }
        tokio::time::timeout(deadline, self.collect())
            .await
            .map_err(|_| RedworkError::Timeout {
                message: format!("statistics collection exceeded {:?}", deadline),
            })
    }
}

async fn collect_with<P>(provider: &P, concurrency: usize) -> QueueStats
where
    P: TopologyProvider + ?Sized,
{
    let concurrency = concurrency.max(1);
    let span = debug_span!("collect_stats", concurrency);

    async move {
        let queue_names = match provider.open_queues().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Failed to list open queues, reporting none: {}", e);
                return QueueStats::new();
            }
        };

        let queues: Vec<Option<(String, QueueStat)>> = stream::iter(queue_names)
            .map(|queue_name| read_queue(provider, queue_name))
            .buffer_unordered(concurrency)
            .collect()
            .await;
        let mut stats: QueueStats = queues.into_iter().flatten().collect();

        let connection_names = match provider.connections().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Failed to list connections, reporting queues only: {}", e);
                return stats;
            }
        };
        let connection_count = connection_names.len();

        let contributions: Vec<Option<(String, Vec<(String, ConnectionStat)>)>> =
            stream::iter(connection_names)
                .map(|connection_name| read_connection(provider, connection_name))
                .buffer_unordered(concurrency)
                .collect()
                .await;

        // Single writer: all lookups are done, assembly happens here only.
        for (connection_name, queue_stats) in contributions.into_iter().flatten() {
            for (queue_name, connection_stat) in queue_stats {
                if !stats.record_connection(&queue_name, &connection_name, connection_stat) {
                    debug!(
                        "Dropping stats of connection {} for queue {} which is not open",
                        connection_name, queue_name
                    );
                }
            }
        }

        debug!(
            queues = stats.len(),
            connections = connection_count,
            "Collected queue statistics"
        );
        stats
    }
    .instrument(span)
    .await
}

async fn read_queue<P>(provider: &P, queue_name: String) -> Option<(String, QueueStat)>
where
    P: TopologyProvider + ?Sized,
{
    let queue = match provider.open_queue(&queue_name).await {
        Ok(queue) => queue,
        Err(e) => {
            warn!("Failed to open queue {}, leaving it out: {}", queue_name, e);
            return None;
        }
    };

    let ready_count = queue.ready_count().await.unwrap_or_else(|e| {
        warn!("Failed to read ready count of queue {}: {}", queue_name, e);
        0
    });

    Some((queue_name, QueueStat::new(ready_count)))
}

async fn read_connection<P>(
    provider: &P,
    connection_name: String,
) -> Option<(String, Vec<(String, ConnectionStat)>)>
where
    P: TopologyProvider + ?Sized,
{
    let connection = match provider.hijack_connection(&connection_name).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Failed to hijack connection {}, skipping it: {}", connection_name, e);
            return None;
        }
    };

    let queue_names = match connection.consuming_queues().await {
        Ok(names) => names,
        Err(e) => {
            warn!(
                "Failed to list queues consumed by connection {}, skipping it: {}",
                connection_name, e
            );
            return None;
        }
    };

    let mut stats = Vec::with_capacity(queue_names.len());
    for queue_name in queue_names {
        let consumers = connection.consumers(&queue_name).await.unwrap_or_else(|e| {
            warn!(
                "Failed to list consumers of connection {} on queue {}: {}",
                connection_name, queue_name, e
            );
            Vec::new()
        });
        let unacked_count = connection
            .unacked_count(&queue_name)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to read unacked count of connection {} on queue {}: {}",
                    connection_name, queue_name, e
                );
                0
            });

        stats.push((queue_name, ConnectionStat::new(unacked_count, consumers)));
    }

    Some((connection_name, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{ConnectionHandle, QueueHandle};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Fixed topology answering from plain maps.
    #[derive(Default)]
    struct StaticTopology {
        queues: Vec<(String, u64)>,
        connections: HashMap<String, Vec<(String, Vec<String>, u64)>>,
        fail_queue_listing: bool,
        listing_delay: Option<Duration>,
    }

    impl StaticTopology {
        fn queue(mut self, name: &str, ready: u64) -> Self {
            self.queues.push((name.to_string(), ready));
            self
        }

        fn consuming(mut self, connection: &str, queue: &str, consumers: &[&str], unacked: u64) -> Self {
            self.connections
                .entry(connection.to_string())
                .or_default()
                .push((
                    queue.to_string(),
                    consumers.iter().map(|c| c.to_string()).collect(),
                    unacked,
                ));
            self
        }
    }

    struct StaticQueue(String, u64);

    #[async_trait]
    impl QueueHandle for StaticQueue {
        fn name(&self) -> &str {
            &self.0
        }

        async fn ready_count(&self) -> Result<u64> {
            Ok(self.1)
        }
    }

    struct StaticConnection(String, Vec<(String, Vec<String>, u64)>);

    #[async_trait]
    impl ConnectionHandle for StaticConnection {
        fn name(&self) -> &str {
            &self.0
        }

        async fn consuming_queues(&self) -> Result<Vec<String>> {
            Ok(self.1.iter().map(|(queue, _, _)| queue.clone()).collect())
        }

        async fn consumers(&self, queue_name: &str) -> Result<Vec<String>> {
            Ok(self
                .1
                .iter()
                .find(|(queue, _, _)| queue == queue_name)
                .map(|(_, consumers, _)| consumers.clone())
                .unwrap_or_default())
        }

        async fn unacked_count(&self, queue_name: &str) -> Result<u64> {
            Ok(self
                .1
                .iter()
                .find(|(queue, _, _)| queue == queue_name)
                .map_or(0, |(_, _, unacked)| *unacked))
        }
    }

    #[async_trait]
    impl TopologyProvider for StaticTopology {
        async fn open_queues(&self) -> Result<Vec<String>> {
            if let Some(delay) = self.listing_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_queue_listing {
                return Err(RedworkError::Store {
                    message: "unreachable".to_string(),
                });
            }
            Ok(self.queues.iter().map(|(name, _)| name.clone()).collect())
        }

        async fn open_queue(&self, queue_name: &str) -> Result<Box<dyn QueueHandle>> {
            let ready = self
                .queues
                .iter()
                .find(|(name, _)| name == queue_name)
                .map_or(0, |(_, ready)| *ready);
            Ok(Box::new(StaticQueue(queue_name.to_string(), ready)))
        }

        async fn connections(&self) -> Result<Vec<String>> {
            Ok(self.connections.keys().cloned().collect())
        }

        async fn hijack_connection(&self, connection_name: &str) -> Result<Box<dyn ConnectionHandle>> {
            Ok(Box::new(StaticConnection(
                connection_name.to_string(),
                self.connections
                    .get(connection_name)
                    .cloned()
                    .unwrap_or_default(),
            )))
        }
    }

    #[tokio::test]
    async fn test_idle_queue() {
        let topology = StaticTopology::default().queue("orders", 3);
        let stats = collect_stats(&topology).await;

        assert_eq!(stats.len(), 1);
        let orders = stats.get("orders").unwrap();
        assert_eq!(orders, &QueueStat::new(3));
        assert_eq!(orders.unacked_count(), 0);
        assert_eq!(orders.consumer_count(), 0);
    }

    #[tokio::test]
    async fn test_connection_contribution() {
        let topology = StaticTopology::default()
            .queue("orders", 3)
            .consuming("worker-1", "orders", &["c1", "c2"], 5);
        let stats = collect_stats(&topology).await;

        let orders = stats.get("orders").unwrap();
        assert_eq!(orders.ready_count, 3);
        assert_eq!(
            orders.connection_stats.get("worker-1"),
            Some(&ConnectionStat::new(5, vec!["c1".to_string(), "c2".to_string()]))
        );
        assert_eq!(orders.unacked_count(), 5);
        assert_eq!(orders.consumer_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_queue_contribution_is_dropped() {
        let topology = StaticTopology::default()
            .queue("orders", 1)
            .consuming("worker-1", "closed", &["c1"], 2)
            .consuming("worker-1", "orders", &["c2"], 1);
        let stats = collect_stats(&topology).await;

        assert_eq!(stats.queue_names(), vec!["orders"]);
        assert!(stats.get("closed").is_none());
        assert_eq!(stats.get("orders").unwrap().unacked_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_queue_listing_yields_empty_snapshot() {
        let topology = StaticTopology {
            fail_queue_listing: true,
            ..StaticTopology::default()
        }
        .queue("orders", 3)
        .consuming("worker-1", "orders", &["c1"], 1);

        assert!(collect_stats(&topology).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_runs_are_equal() {
        let topology = StaticTopology::default()
            .queue("orders", 3)
            .queue("emails", 0)
            .consuming("worker-1", "orders", &["c1", "c2"], 5)
            .consuming("worker-2", "orders", &["c3"], 0)
            .consuming("worker-2", "emails", &["c4"], 7);

        let first = collect_stats(&topology).await;
        let second = collect_stats(&topology).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_collection_matches_sequential() {
        let mut topology = StaticTopology::default();
        for i in 0..20 {
            topology = topology.queue(&format!("queue-{}", i), i);
        }
        for w in 0..8 {
            for q in (0..20).step_by(w + 1) {
                topology = topology.consuming(
                    &format!("worker-{}", w),
                    &format!("queue-{}", q),
                    &["a", "b"],
                    (w * q) as u64,
                );
            }
        }
        let topology = Arc::new(topology);

        let sequential = collect_stats(topology.as_ref()).await;
        let concurrent = StatsCollector::with_config(
            topology,
            CollectorConfig::new().with_concurrency(8),
        )
        .collect()
        .await;

        assert_eq!(sequential, concurrent);
        assert_eq!(concurrent.len(), 20);
        assert_eq!(concurrent.get("queue-0").unwrap().connection_stats.len(), 8);
    }

    #[tokio::test]
    async fn test_collect_with_timeout_succeeds_in_time() {
        let topology = Arc::new(StaticTopology::default().queue("orders", 3));
        let collector = StatsCollector::new(topology);

        let stats = collector.collect_with_timeout().await.unwrap();
        assert_eq!(stats.get("orders").unwrap().ready_count, 3);
    }

    #[tokio::test]
    async fn test_collect_with_timeout_discards_slow_run() {
        let topology = StaticTopology {
            listing_delay: Some(Duration::from_secs(5)),
            ..StaticTopology::default()
        }
        .queue("orders", 3);
        let collector = StatsCollector::with_config(
            Arc::new(topology),
            CollectorConfig::new().with_collect_timeout(Duration::from_millis(50)),
        );

        let result = collector.collect_with_timeout().await;
        assert!(matches!(result, Err(RedworkError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_zero_timeout_disables_deadline() {
        let topology = StaticTopology {
            listing_delay: Some(Duration::from_millis(20)),
            ..StaticTopology::default()
        }
        .queue("orders", 3);
        let collector = StatsCollector::with_config(
            Arc::new(topology),
            CollectorConfig::new().with_collect_timeout(Duration::ZERO),
        );

        let stats = collector.collect_with_timeout().await.unwrap();
        assert_eq!(stats.get("orders").unwrap().ready_count, 3);
    }

    #[test]
    fn test_config_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.collect_timeout, Duration::from_secs(10));

        let config = CollectorConfig::new().with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }
}
