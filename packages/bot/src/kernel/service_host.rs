//! Long-running service supervision.
//!
//! Each watcher implements [`Service`]. The [`ServiceHost`] spawns every
//! service on its own task, hands them a shared [`CancellationToken`], and
//! waits. Services never talk to each other; when one returns an error it is
//! logged and the others keep running.
//!
//! ```text
//! ServiceHost
//!     ├─► request-watcher   (stream)
//!     ├─► approval-processor (poll every 2m)
//!     └─► invite-processor   (poll every 2m)
//! ```

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A long-running unit of work.
#[async_trait]
pub trait Service: Send + 'static {
    fn name(&self) -> &'static str;

    /// Run until finished, failed, or `shutdown` is cancelled.
    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()>;
}

pub struct ServiceHost {
    services: Vec<Box<dyn Service>>,
    shutdown: CancellationToken,
}

impl Default for ServiceHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHost {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_service(mut self, service: impl Service) -> Self {
        self.services.push(Box::new(service));
        self
    }

    /// Token that stops every service when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run all services until they have all exited. Ctrl-C cancels them.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown.clone();
        tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    result = tokio::signal::ctrl_c() => {
                        match result {
                            Ok(()) => info!("shutdown signal received"),
                            Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
                        }
                        shutdown.cancel();
                    }
                }
            }
        });

        self.run(shutdown).await
    }

    /// Run all services until they have all exited or `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let mut tasks = JoinSet::new();
        for service in self.services {
            let name = service.name();
            let token = shutdown.child_token();
            info!(service = name, "starting service");
            tasks.spawn(async move { (name, service.run(token).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => info!(service = name, "service stopped"),
                Ok((name, Err(e))) => {
                    error!(service = name, error = ?e, "service failed; remaining services keep running")
                }
                Err(e) => error!(error = %e, "service task panicked"),
            }
        }

        Ok(())
    }
}

/// Sleep for `duration`, waking early on shutdown. Returns `false` if shut down.
pub async fn sleep_or_shutdown(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Service for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            shutdown.cancelled().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_service_does_not_stop_others() {
        let runs = Arc::new(AtomicUsize::new(0));
        let host = ServiceHost::new()
            .with_service(Counter { runs: runs.clone(), fail: true })
            .with_service(Counter { runs: runs.clone(), fail: false });
        let token = host.shutdown_token();
        let stop = token.clone();

        let handle = tokio::spawn(async move { host.run(token).await });

        while runs.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        stop.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn cancelled_services_exit_cleanly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let host = ServiceHost::new().with_service(Counter { runs: runs.clone(), fail: false });
        let token = host.shutdown_token();
        let stop = token.clone();

        let handle = tokio::spawn(async move { host.run(token).await });
        while runs.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        stop.cancel();

        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn sleep_wakes_on_shutdown() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(!sleep_or_shutdown(Duration::from_secs(3600), &token).await);
        assert!(sleep_or_shutdown(Duration::ZERO, &CancellationToken::new()).await);
    }
}
