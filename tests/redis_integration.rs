//! Tests against a live Redis server.
//!
//! Run with `REDIS_URL=redis://127.0.0.1:6379/15 cargo test -- --ignored`.
//! The selected database is flushed.

use redwork::{
    KeyLayout, RedisTopology, StatsCollector,
    store::{RedisStore, Store, StoreReply},
};
use std::{sync::Arc, time::Duration};

async fn store() -> RedisStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
    let store = RedisStore::connect(&url).await.unwrap();
    store.flush_db().await.into_result().unwrap();
    store
}

#[tokio::test]
#[ignore]
async fn test_redis_store_commands() {
    let store = store().await;

    assert!(store.get("missing").await.is_empty());
    store.set("key", "value", Some(Duration::from_secs(30))).await;
    assert_eq!(store.get("key").await.ok(), Some("value".to_string()));
    assert!(matches!(store.ttl("key").await, StoreReply::Value(ttl) if ttl <= Duration::from_secs(30)));
    assert_eq!(store.del("key").await.ok(), Some(1));
    assert!(store.set("brief", "value", Some(Duration::from_micros(500))).await.is_value());

    for value in ["a", "b", "c"] {
        store.lpush("list", value).await;
    }
    assert_eq!(store.llen("list").await.ok(), Some(3));
    assert_eq!(store.rpoplpush("list", "other").await.ok(), Some("a".to_string()));
    assert_eq!(store.lrem("list", 0, "b").await.ok(), Some(1));
    store.ltrim("list", 0, 0).await;
    assert_eq!(store.llen("list").await.ok(), Some(1));

    store.sadd("set", "x").await;
    store.sadd("set", "y").await;
    let mut members = store.smembers("set").await.into_result_or_default().unwrap();
    members.sort();
    assert_eq!(members, vec!["x", "y"]);
    assert_eq!(store.srem("set", "x").await.ok(), Some(1));
}

#[tokio::test]
#[ignore]
async fn test_collect_from_redis() {
    let store = store().await;
    let keys = KeyLayout::default();

    store.sadd(&keys.queues(), "orders").await;
    store.lpush(&keys.queue_ready("orders"), "job-1").await;
    store.sadd(&keys.connections(), "worker-1").await;
    store
        .set(&keys.connection_heartbeat("worker-1"), "1", Some(Duration::from_secs(60)))
        .await;
    store.sadd(&keys.connection_queues("worker-1"), "orders").await;
    store
        .sadd(&keys.connection_queue_consumers("worker-1", "orders"), "c1")
        .await;
    store
        .lpush(&keys.connection_queue_unacked("worker-1", "orders"), "job-2")
        .await;

    let collector = StatsCollector::new(Arc::new(RedisTopology::new(store)));
    let stats = collector.collect_with_timeout().await.unwrap();

    let orders = stats.get("orders").unwrap();
    assert_eq!(orders.ready_count, 1);
    assert_eq!(orders.unacked_count(), 1);
    assert_eq!(orders.consumer_count(), 1);
}
