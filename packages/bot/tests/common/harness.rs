//! Test harness for integration testing.
//!
//! Every test gets a fresh in-memory SQLite store and a `MockPlatform`, wired
//! together into the same `BotDeps` the real bot builds. Timings are zeroed so
//! cycles run back to back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use network_adder::domains::invites::RestrictedSubreddit;
use network_adder::kernel::{BotDeps, MockPlatform, Store};
use network_adder::BotSettings;
use test_context::AsyncTestContext;

pub const PUBLIC_SUBREDDIT: &str = "network_hub";

/// Test harness that manages test infrastructure.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     ctx.platform.add_subreddit("sub1", true);
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub store: Store,
    /// Same mock the deps hold; use it to arrange and assert Reddit state
    pub platform: Arc<MockPlatform>,
    pub deps: BotDeps,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        // In-memory database is dropped with the pool
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = Store::in_memory()
            .await
            .context("Failed to open in-memory store")?;
        let platform = Arc::new(MockPlatform::new());
        platform.add_subreddit(PUBLIC_SUBREDDIT, true);

        let deps = BotDeps::new(store.clone(), platform.clone(), test_settings());

        Ok(Self {
            store,
            platform,
            deps,
        })
    }

    /// Deps sharing this harness's store and mock, with every interval set
    /// to `interval` so running services do not spin.
    pub fn deps_with_interval(&self, interval: Duration) -> BotDeps {
        BotDeps::new(
            self.store.clone(),
            self.platform.clone(),
            BotSettings {
                approval_interval: interval,
                invite_interval: interval,
                resubscribe_delay: interval,
                ..test_settings()
            },
        )
    }

    /// Register restricted subreddits the bot already moderates
    pub async fn restricted(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.platform.add_subreddit(name, true);
            RestrictedSubreddit::register(name, &self.store).await?;
        }
        Ok(())
    }
}

/// Poll `check` until it holds, panicking after about five seconds.
pub async fn wait_for<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

pub fn test_settings() -> BotSettings {
    BotSettings {
        public_subreddit: PUBLIC_SUBREDDIT.to_string(),
        approval_interval: Duration::ZERO,
        invite_interval: Duration::ZERO,
        grant_pause: Duration::ZERO,
        resubscribe_delay: Duration::ZERO,
    }
}
