//! Environment overrides live in their own test binary so no other test
//! observes the modified process environment.

use redwork::RedworkConfig;
use std::time::Duration;

#[test]
fn test_env_overrides() {
    unsafe {
        std::env::set_var("REDWORK_REDIS_URL", "redis://cache:6380/2");
        std::env::set_var("REDWORK_KEY_PREFIX", "billing");
        std::env::set_var("REDWORK_COLLECT_CONCURRENCY", "8");
        std::env::set_var("REDWORK_COLLECT_TIMEOUT_SECONDS", "3");
        std::env::set_var("REDWORK_DASHBOARD_BIND", "0.0.0.0");
        std::env::set_var("REDWORK_DASHBOARD_PORT", "9000");
    }

    let config = RedworkConfig::from_env().unwrap();
    assert_eq!(config.redis.url, "redis://cache:6380/2");
    assert_eq!(config.redis.key_layout().queues(), "billing::queues");
    assert_eq!(config.collector.concurrency, 8);
    assert_eq!(config.collector.collect_timeout, Duration::from_secs(3));
    assert_eq!(config.dashboard.socket_addr().unwrap().to_string(), "0.0.0.0:9000");

    unsafe {
        std::env::set_var("REDWORK_COLLECT_CONCURRENCY", "many");
    }
    assert!(RedworkConfig::from_env().is_err());

    unsafe {
        std::env::set_var("REDWORK_COLLECT_CONCURRENCY", "0");
    }
    // clamped to a single in-flight lookup
    assert_eq!(RedworkConfig::from_env().unwrap().collector.concurrency, 1);
}
