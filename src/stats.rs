//! Point-in-time statistics for queues and the connections consuming them.
//!
//! A [`QueueStats`] snapshot is produced by one run of the
//! [collector](crate::collector) and never changes afterwards. Totals for a queue
//! are derived from its per-connection entries on demand rather than stored.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// One connection's observed contribution to one queue.
///
/// The consumer list and the unacked count are read independently and can
/// legitimately disagree: a consumer may hold no deliveries, and deliveries may
/// linger briefly after their consumer went away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStat {
    /// Deliveries handed to this connection for the queue and not yet acknowledged
    pub unacked_count: u64,
    /// Consumer identifiers this connection registered against the queue
    pub consumers: Vec<String>,
}

impl ConnectionStat {
    pub fn new(unacked_count: u64, consumers: Vec<String>) -> Self {
        Self {
            unacked_count,
            consumers,
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }
}

impl fmt::Display for ConnectionStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[unacked:{} consumers:{}]",
            self.unacked_count,
            self.consumers.len()
        )
    }
}

/// Aggregate state of a single queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStat {
    /// Deliveries waiting in the queue
    pub ready_count: u64,
    /// Contributions keyed by connection name
    pub connection_stats: HashMap<String, ConnectionStat>,
}

impl QueueStat {
    /// A queue with no consuming connections yet.
    pub fn new(ready_count: u64) -> Self {
        Self {
            ready_count,
            connection_stats: HashMap::new(),
        }
    }

    /// Total unacked deliveries across all connections.
    pub fn unacked_count(&self) -> u64 {
        self.connection_stats
            .values()
            .map(|stat| stat.unacked_count)
            .sum()
    }

    /// Total consumers across all connections.
    pub fn consumer_count(&self) -> usize {
        self.connection_stats
            .values()
            .map(ConnectionStat::consumer_count)
            .sum()
    }

    /// Connection names in sorted order.
    pub fn connection_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connection_stats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Display for QueueStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ready:{} unacked:{} consumers:{}]",
            self.ready_count,
            self.unacked_count(),
            self.consumer_count()
        )
    }
}

/// A full snapshot: queue name to queue state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueStats {
    queues: HashMap<String, QueueStat>,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, queue_name: &str) -> Option<&QueueStat> {
        self.queues.get(queue_name)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queue names in sorted order.
    pub fn queue_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.queues.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Entries in sorted queue-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueueStat)> {
        self.queue_names()
            .into_iter()
            .filter_map(move |name| self.queues.get(name).map(|stat| (name, stat)))
    }

    /// Record a connection's contribution to a queue seen in the queue pass.
    ///
    /// Returns `false` and leaves the snapshot untouched when the queue is not
    /// part of it.
    pub(crate) fn record_connection(
        &mut self,
        queue_name: &str,
        connection_name: &str,
        stat: ConnectionStat,
    ) -> bool {
        match self.queues.get_mut(queue_name) {
            Some(queue) => {
                queue
                    .connection_stats
                    .insert(connection_name.to_string(), stat);
                true
            }
            None => false,
        }
    }
}

impl Extend<(String, QueueStat)> for QueueStats {
    fn extend<I: IntoIterator<Item = (String, QueueStat)>>(&mut self, iter: I) {
        self.queues.extend(iter);
    }
}

impl FromIterator<(String, QueueStat)> for QueueStats {
    fn from_iter<I: IntoIterator<Item = (String, QueueStat)>>(iter: I) -> Self {
        Self {
            queues: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_idle_queue_totals() {
        let stat = QueueStat::new(3);
        assert_eq!(stat.ready_count, 3);
        assert!(stat.connection_stats.is_empty());
        assert_eq!(stat.unacked_count(), 0);
        assert_eq!(stat.consumer_count(), 0);
    }

    #[test]
    fn test_totals_sum_connection_stats() {
        let mut stat = QueueStat::new(10);
        stat.connection_stats.insert(
            "worker-1".to_string(),
            ConnectionStat::new(5, consumers(&["c1", "c2"])),
        );
        stat.connection_stats.insert(
            "worker-2".to_string(),
            ConnectionStat::new(2, consumers(&["c3"])),
        );
        // consumers and unacked are independent
        stat.connection_stats.insert(
            "worker-3".to_string(),
            ConnectionStat::new(4, Vec::new()),
        );
        stat.connection_stats.insert(
            "worker-4".to_string(),
            ConnectionStat::new(0, consumers(&["c4", "c5", "c6"])),
        );

        assert_eq!(stat.unacked_count(), 11);
        assert_eq!(stat.consumer_count(), 6);
        assert_eq!(
            stat.connection_names(),
            vec!["worker-1", "worker-2", "worker-3", "worker-4"]
        );
    }

    #[test]
    fn test_display() {
        let connection = ConnectionStat::new(5, consumers(&["c1", "c2"]));
        assert_eq!(connection.to_string(), "[unacked:5 consumers:2]");

        let mut queue = QueueStat::new(3);
        queue
            .connection_stats
            .insert("worker-1".to_string(), connection);
        assert_eq!(queue.to_string(), "[ready:3 unacked:5 consumers:2]");
    }

    #[test]
    fn test_record_connection_requires_known_queue() {
        let mut stats: QueueStats = [("orders".to_string(), QueueStat::new(3))]
            .into_iter()
            .collect();

        assert!(stats.record_connection("orders", "worker-1", ConnectionStat::new(1, Vec::new())));
        assert!(!stats.record_connection("ghost", "worker-1", ConnectionStat::new(1, Vec::new())));

        assert_eq!(stats.len(), 1);
        assert!(stats.get("ghost").is_none());
        assert_eq!(stats.get("orders").unwrap().unacked_count(), 1);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let stats: QueueStats = ["zeta", "alpha", "mid"]
            .into_iter()
            .map(|name| (name.to_string(), QueueStat::new(0)))
            .collect();

        assert_eq!(stats.queue_names(), vec!["alpha", "mid", "zeta"]);
        let names: Vec<&str> = stats.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_serde_shape() {
        let mut stats = QueueStats::new();
        let mut queue = QueueStat::new(3);
        queue.connection_stats.insert(
            "worker-1".to_string(),
            ConnectionStat::new(5, consumers(&["c1"])),
        );
        stats.extend([("orders".to_string(), queue)]);

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["orders"]["ready_count"], 3);
        assert_eq!(
            value["orders"]["connection_stats"]["worker-1"]["unacked_count"],
            5
        );

        let decoded: QueueStats = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, stats);
    }
}
