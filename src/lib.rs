//! # Redwork
//!
//! Statistics for Redis-backed work queues: how many deliveries are waiting in
//! every queue, how many are in flight without acknowledgement, and which
//! connections are consuming them.
//!
//! ## Features
//!
//! - **Snapshot collection**: walks every open queue and every registered
//!   connection, including stale ones, and assembles a [`QueueStats`] snapshot
//! - **Best effort**: a lookup that fails is logged and reported as missing data,
//!   never as a failed report
//! - **Reports**: plain text, a self-contained HTML table, JSON and terminal tables
//! - **Dashboard**: a small warp server serving live reports (enabled by default)
//! - **Pluggable backends**: collect from Redis, from the in-memory store, or from
//!   any [`TopologyProvider`](topology::TopologyProvider) implementation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use redwork::{render_text, store::RedisStore, topology::RedisTopology, StatsCollector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisStore::connect("redis://127.0.0.1:6379/0").await?;
//!     let collector = StatsCollector::new(Arc::new(RedisTopology::new(store)));
//!
//!     let stats = collector.collect().await;
//!     print!("{}", render_text(&stats));
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Queues and connections
//!
//! A queue holds ready deliveries. A connection is a worker process registered
//! with the queue system; it consumes zero or more queues through one or more
//! consumers and holds the deliveries it has not acknowledged yet.
//!
//! ### Snapshots
//!
//! Nothing locks the topology while it is read, and other processes keep
//! opening, closing and hijacking queues and connections. A snapshot is
//! therefore an approximation of the state at collection time. Each run
//! produces a new, independent snapshot.
//!
//! ## Feature Flags
//!
//! - `dashboard` - Enable the warp HTTP dashboard (default)

pub mod collector;
pub mod config;
pub mod error;
pub mod keys;
pub mod render;
pub mod stats;
pub mod store;
pub mod topology;

#[cfg(feature = "dashboard")]
pub mod dashboard;

pub use collector::{CollectorConfig, StatsCollector, collect_stats};
pub use config::RedworkConfig;
pub use error::RedworkError;
pub use keys::KeyLayout;
pub use render::{ReportFormat, render_html, render_json, render_table, render_text};
pub use stats::{ConnectionStat, QueueStat, QueueStats};
pub use store::{Store, StoreReply};
pub use topology::{ConnectionHandle, QueueHandle, RedisTopology, TopologyProvider};

#[cfg(feature = "dashboard")]
pub use dashboard::StatsDashboard;

/// Convenient type alias for Results with [`RedworkError`] as the error type.
pub type Result<T> = std::result::Result<T, RedworkError>;
