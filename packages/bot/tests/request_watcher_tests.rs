//! Integration tests for the request watcher.
//!
//! - Only "request"-flaired posts are tracked
//! - The stream is resubscribed after transport failures, token outages included
//! - Non-transport stream errors end the watcher

mod common;

use crate::common::{wait_for, TestHarness};
use network_adder::domains::requests::{RequestPost, RequestWatcher};
use network_adder::kernel::{mock_submission, PlatformError, Service};
use reddit_client::RedditError;
use test_context::test_context;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Tag gating
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn request_posts_are_tracked_in_any_case(ctx: &TestHarness) {
    let watcher = RequestWatcher::new(ctx.deps.clone());

    assert!(watcher
        .observe(&mock_submission("a1", "alice", Some("Request")))
        .await
        .unwrap());
    assert!(watcher
        .observe(&mock_submission("a2", "bob", Some("  REQUEST ")))
        .await
        .unwrap());

    let ids = RequestPost::find_all_ids(&ctx.store).await.unwrap();
    assert_eq!(ids, vec!["a1", "a2"]);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn other_posts_are_ignored(ctx: &TestHarness) {
    let watcher = RequestWatcher::new(ctx.deps.clone());

    for (id, tag) in [("q1", Some("question")), ("q2", None), ("q3", Some("approved"))] {
        assert!(!watcher
            .observe(&mock_submission(id, "carol", tag))
            .await
            .unwrap());
    }

    assert!(RequestPost::find_all_ids(&ctx.store).await.unwrap().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn repeated_sightings_track_once(ctx: &TestHarness) {
    let watcher = RequestWatcher::new(ctx.deps.clone());
    let post = mock_submission("r1", "alice", Some("request"));

    assert!(watcher.observe(&post).await.unwrap());
    assert!(!watcher.observe(&post).await.unwrap());

    assert_eq!(RequestPost::find_all_ids(&ctx.store).await.unwrap(), vec!["r1"]);
}

// =============================================================================
// Running as a service
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn watcher_resubscribes_after_transport_failure(ctx: &TestHarness) {
    ctx.platform.queue_stream(vec![
        Ok(mock_submission("s1", "alice", Some("request"))),
        Ok(mock_submission("s2", "bob", Some("question"))),
        Err(PlatformError::Transport("connection reset".into())),
    ]);
    ctx.platform.queue_stream(vec![
        Err(PlatformError::NotFound("submission gone".into())),
        Ok(mock_submission("s3", "carol", Some("request"))),
    ]);

    let shutdown = CancellationToken::new();
    let watcher = Box::new(RequestWatcher::new(ctx.deps.clone()));
    let handle = tokio::spawn(watcher.run(shutdown.clone()));

    let store = ctx.store.clone();
    let mut tracked = Vec::new();
    for _ in 0..200 {
        tracked = RequestPost::find_all_ids(&store).await.unwrap();
        if tracked.len() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(tracked, vec!["s1", "s3"]);
    assert_eq!(ctx.platform.subscription_count(), 2);

    shutdown.cancel();
    assert!(handle.await.unwrap().is_ok());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn token_endpoint_outage_is_retried(ctx: &TestHarness) {
    let outage = PlatformError::from(RedditError::Api {
        status: 503,
        message: "token endpoint: upstream busy".into(),
    });
    assert!(matches!(outage, PlatformError::Transport(_)));

    ctx.platform.queue_stream(vec![Err(outage)]);
    ctx.platform
        .queue_stream(vec![Ok(mock_submission("s9", "dave", Some("request")))]);

    let shutdown = CancellationToken::new();
    let watcher = Box::new(RequestWatcher::new(ctx.deps.clone()));
    let handle = tokio::spawn(watcher.run(shutdown.clone()));

    let store = ctx.store.clone();
    wait_for("s9 to be tracked", || {
        let store = store.clone();
        async move { RequestPost::is_tracked("s9", &store).await.unwrap() }
    })
    .await;
    assert_eq!(ctx.platform.subscription_count(), 2);

    shutdown.cancel();
    assert!(handle.await.unwrap().is_ok());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn malformed_stream_error_stops_the_watcher(ctx: &TestHarness) {
    ctx.platform.queue_stream(vec![Err(PlatformError::Malformed(
        "unexpected listing".into(),
    ))]);

    let watcher = Box::new(RequestWatcher::new(ctx.deps.clone()));
    let result = watcher.run(CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(ctx.platform.subscription_count(), 1);
}
