//! Startup checks on the public subreddit.

mod common;

use crate::common::{TestHarness, PUBLIC_SUBREDDIT};
use network_adder::kernel::{check_public_subreddit, PreflightError};
use test_context::test_context;

#[test_context(TestHarness)]
#[tokio::test]
async fn moderated_public_subreddit_passes(ctx: &TestHarness) {
    check_public_subreddit(ctx.platform.as_ref(), PUBLIC_SUBREDDIT)
        .await
        .unwrap();
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_subreddit_is_rejected(ctx: &TestHarness) {
    let err = check_public_subreddit(ctx.platform.as_ref(), "nowhere")
        .await
        .unwrap_err();

    assert!(matches!(err, PreflightError::MissingSubreddit(name) if name == "nowhere"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unmoderated_subreddit_is_rejected(ctx: &TestHarness) {
    ctx.platform.add_subreddit("someone_elses", false);

    let err = check_public_subreddit(ctx.platform.as_ref(), "someone_elses")
        .await
        .unwrap_err();

    assert!(matches!(err, PreflightError::NotModerator(_)));
    assert_eq!(err.to_string(), "You must be a mod in this sub: r/someone_elses");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn blank_name_is_rejected(ctx: &TestHarness) {
    let err = check_public_subreddit(ctx.platform.as_ref(), "   ")
        .await
        .unwrap_err();

    assert!(matches!(err, PreflightError::BlankName));
}
