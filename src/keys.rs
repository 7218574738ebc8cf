//! Redis key layout for queues and connections.
//!
//! Every key shares a prefix (`rmq` by default) so several independent queue
//! systems can live in one Redis database. Queue names are wrapped in brackets
//! inside compound keys, which keeps a queue called `a::b` from colliding with
//! the key separators.

use serde::{Deserialize, Serialize};

/// Default prefix applied to every key.
pub const DEFAULT_KEY_PREFIX: &str = "rmq";

/// Builds the Redis keys used by the queue topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLayout {
    prefix: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl KeyLayout {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Set of all open queue names
    pub fn queues(&self) -> String {
        format!("{}::queues", self.prefix)
    }

    /// Set of all registered connection names
    pub fn connections(&self) -> String {
        format!("{}::connections", self.prefix)
    }

    /// Heartbeat key refreshed by a live connection
    pub fn connection_heartbeat(&self, connection: &str) -> String {
        format!("{}::connection::{}::heartbeat", self.prefix, connection)
    }

    /// Set of queue names a connection is consuming
    pub fn connection_queues(&self, connection: &str) -> String {
        format!("{}::connection::{}::queues", self.prefix, connection)
    }

    /// Set of consumer identifiers a connection registered against a queue
    pub fn connection_queue_consumers(&self, connection: &str, queue: &str) -> String {
        format!(
            "{}::connection::{}::queue::[{}]::consumers",
            self.prefix, connection, queue
        )
    }

    /// List of deliveries a connection holds for a queue but has not acknowledged
    pub fn connection_queue_unacked(&self, connection: &str, queue: &str) -> String {
        format!(
            "{}::connection::{}::queue::[{}]::unacked",
            self.prefix, connection, queue
        )
    }

    /// List of deliveries waiting in a queue
    pub fn queue_ready(&self, queue: &str) -> String {
        format!("{}::queue::[{}]::ready", self.prefix, queue)
    }

    /// List of deliveries consumers rejected from a queue
    pub fn queue_rejected(&self, queue: &str) -> String {
        format!("{}::queue::[{}]::rejected", self.prefix, queue)
    }
}
