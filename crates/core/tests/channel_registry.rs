//! Unit tests for `ChannelRegistry`.
//!
//! Exercise the push-delivery registry directly, without any HTTP
//! upgrades: register/unregister semantics, single-shot delivery, and
//! shutdown behaviour.

use relay_core::channels::ChannelRegistry;
use serde_json::json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Test: new registry starts empty
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_registry_has_zero_channels() {
    let registry = ChannelRegistry::new();

    assert_eq!(registry.channel_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: register() increments the channel count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_increments_channel_count() {
    let registry = ChannelRegistry::new();

    let _rx = registry.register(Uuid::new_v4()).await;

    assert_eq!(registry.channel_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: unregister() removes the channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregister_removes_channel() {
    let registry = ChannelRegistry::new();
    let job_id = Uuid::new_v4();

    let _rx = registry.register(job_id).await;
    assert_eq!(registry.channel_count().await, 1);

    registry.unregister(job_id).await;
    assert_eq!(registry.channel_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: unregister() with unknown job is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregister_unknown_job_is_noop() {
    let registry = ChannelRegistry::new();

    let _rx = registry.register(Uuid::new_v4()).await;
    registry.unregister(Uuid::new_v4()).await;

    assert_eq!(registry.channel_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: send_result() delivers the payload and removes the channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_result_delivers_once_and_removes() {
    let registry = ChannelRegistry::new();
    let job_id = Uuid::new_v4();

    let mut rx = registry.register(job_id).await;

    let delivered = registry
        .send_result(job_id, json!({"format": "text", "data": "{}"}))
        .await;
    assert!(delivered);

    let payload = rx.recv().await.expect("payload should be delivered");
    assert_eq!(payload["format"], "text");

    // One result per channel: the entry is gone afterwards.
    assert_eq!(registry.channel_count().await, 0);
    assert!(!registry.send_result(job_id, json!({})).await);
}

// ---------------------------------------------------------------------------
// Test: send_result() without a registered channel reports failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_result_without_channel_returns_false() {
    let registry = ChannelRegistry::new();

    assert!(!registry.send_result(Uuid::new_v4(), json!({})).await);
}

// ---------------------------------------------------------------------------
// Test: send_result() to a dropped receiver cleans up the entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_result_to_dropped_receiver_cleans_up() {
    let registry = ChannelRegistry::new();
    let job_id = Uuid::new_v4();

    let rx = registry.register(job_id).await;
    drop(rx);

    assert!(!registry.send_result(job_id, json!({})).await);
    assert_eq!(registry.channel_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: registering twice replaces the previous channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_twice_replaces_channel() {
    let registry = ChannelRegistry::new();
    let job_id = Uuid::new_v4();

    let mut stale_rx = registry.register(job_id).await;
    let mut fresh_rx = registry.register(job_id).await;
    assert_eq!(registry.channel_count().await, 1);

    assert!(registry.send_result(job_id, json!({"n": 1})).await);

    assert!(fresh_rx.recv().await.is_some());
    assert!(stale_rx.recv().await.is_none(), "stale channel should be closed");
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() clears every channel and closes receivers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_clears_and_closes() {
    let registry = ChannelRegistry::new();

    let mut rx1 = registry.register(Uuid::new_v4()).await;
    let mut rx2 = registry.register(Uuid::new_v4()).await;
    assert_eq!(registry.channel_count().await, 2);

    registry.shutdown_all().await;

    assert_eq!(registry.channel_count().await, 0);
    assert!(rx1.recv().await.is_none());
    assert!(rx2.recv().await.is_none());
}
