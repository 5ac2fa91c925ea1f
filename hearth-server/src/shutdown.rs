//! Shutdown coordination
//!
//! Waits for a termination request, stops the accept loop, then gives live
//! sessions a bounded drain window before cancelling whatever is left.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use hearth_utils::{HearthError, Result};

use crate::registry::RegistryHandle;

/// Time force-closed sessions get to unwind after being cancelled
pub const FORCE_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// What started the shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// Interrupt or terminate request
    Signal,
    /// The accept loop ended on its own
    ListenerExited,
}

/// Outcome of the drain protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub trigger: ShutdownTrigger,
    /// Sessions that had to be cancelled when the drain window elapsed
    pub forced: usize,
    /// Time from trigger to completion
    pub elapsed: Duration,
}

impl ShutdownReport {
    pub fn drained_naturally(&self) -> bool {
        self.forced == 0
    }
}

pub struct ShutdownCoordinator {
    drain_timeout: Duration,
    shutdown: CancellationToken,
    registry: RegistryHandle,
}

impl ShutdownCoordinator {
    pub fn new(drain_timeout: Duration, shutdown: CancellationToken, registry: RegistryHandle) -> Self {
        Self {
            drain_timeout,
            shutdown,
            registry,
        }
    }

    /// Wait for `signal`, then stop accepting and drain sessions
    pub async fn run<F>(self, signal: F, mut accept_loop: JoinHandle<()>) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        let (trigger, listener_exit) = tokio::select! {
            _ = signal => (ShutdownTrigger::Signal, None),
            result = &mut accept_loop => (ShutdownTrigger::ListenerExited, Some(result)),
        };

        let started = Instant::now();
        info!("Stopping server");

        self.shutdown.cancel();
        match self.registry.seal().await {
            Ok(live) => debug!(live, "Registry sealed"),
            Err(e) => error!("Could not seal registry: {}", e),
        }

        let stopped = match listener_exit {
            Some(result) => Err(result
                .err()
                .map(|e| HearthError::internal(format!("accept loop failed: {}", e)))
                .unwrap_or(HearthError::ServerClosed)),
            None => accept_loop
                .await
                .map_err(|e| HearthError::internal(format!("accept loop failed: {}", e))),
        };
        log_stop_result(stopped);

        let forced = self.drain().await;

        ShutdownReport {
            trigger,
            forced,
            elapsed: started.elapsed(),
        }
    }

    /// Returns the number of sessions that were force closed
    async fn drain(&self) -> usize {
        let live = self.registry.live_count();
        if live > 0 {
            info!(
                "Waiting up to {:?} for {} session(s) to close",
                self.drain_timeout, live
            );
        }

        if tokio::time::timeout(self.drain_timeout, self.registry.wait_empty())
            .await
            .is_ok()
        {
            info!("All sessions closed");
            return 0;
        }

        let forced = match self.registry.close_all().await {
            Ok(n) => n,
            Err(e) => {
                error!("Could not force close sessions: {}", e);
                0
            }
        };
        warn!("Drain window elapsed, force closed {} session(s)", forced);

        if tokio::time::timeout(FORCE_CLOSE_GRACE, self.registry.wait_empty())
            .await
            .is_err()
        {
            warn!(
                "{} session(s) still live after force close",
                self.registry.live_count()
            );
        }

        forced
    }
}

/// An already-closed listener is expected; anything else is worth an error
fn log_stop_result(result: Result<()>) {
    match result {
        Ok(()) => debug!("Accept loop stopped"),
        Err(HearthError::ServerClosed) => debug!("Listener was already closed"),
        Err(e) => error!("Could not stop server: {}", e),
    }
}

/// Resolve on SIGINT or SIGTERM
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => info!("Received interrupt"),
        _ = terminate => info!("Received terminate"),
    }
}

/// Resolve on Ctrl-C
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received interrupt");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{self, SessionEntry};
    use std::net::SocketAddr;
    use uuid::Uuid;

    fn peer() -> SocketAddr {
        "127.0.0.1:6000".parse().unwrap()
    }

    /// A fake session that deregisters itself when cancelled or after `lifetime`
    async fn fake_session(registry: &RegistryHandle, lifetime: Option<Duration>) -> CancellationToken {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        registry
            .register(SessionEntry::new(id, peer(), cancel.clone()))
            .await
            .unwrap();

        let registry = registry.clone();
        let token = cancel.clone();
        tokio::spawn(async move {
            match lifetime {
                Some(d) => tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(d) => {}
                },
                None => token.cancelled().await,
            }
            registry.deregister(id).await;
        });
        cancel
    }

    fn idle_accept_loop(shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { shutdown.cancelled().await })
    }

    #[tokio::test]
    async fn test_drains_naturally() {
        let (registry, _task) = registry::spawn();
        let shutdown = CancellationToken::new();
        let cancel = fake_session(&registry, Some(Duration::from_millis(50))).await;

        let coordinator =
            ShutdownCoordinator::new(Duration::from_secs(5), shutdown.clone(), registry.clone());
        let report = coordinator
            .run(async {}, idle_accept_loop(shutdown.clone()))
            .await;

        assert_eq!(report.trigger, ShutdownTrigger::Signal);
        assert!(report.drained_naturally());
        assert!(!cancel.is_cancelled());
        assert!(shutdown.is_cancelled());
        assert!(report.elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_forces_stragglers() {
        let (registry, _task) = registry::spawn();
        let shutdown = CancellationToken::new();
        let quick = fake_session(&registry, Some(Duration::from_millis(10))).await;
        let stuck = fake_session(&registry, None).await;

        let drain = Duration::from_millis(200);
        let coordinator = ShutdownCoordinator::new(drain, shutdown.clone(), registry.clone());
        let report = coordinator
            .run(async {}, idle_accept_loop(shutdown.clone()))
            .await;

        assert_eq!(report.forced, 1);
        assert!(stuck.is_cancelled());
        assert!(!quick.is_cancelled());
        assert!(report.elapsed >= drain);
        assert!(report.elapsed < drain + Duration::from_millis(500));
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_no_sessions() {
        let (registry, _task) = registry::spawn();
        let shutdown = CancellationToken::new();
        let coordinator =
            ShutdownCoordinator::new(Duration::from_secs(5), shutdown.clone(), registry);

        let report = coordinator
            .run(async {}, idle_accept_loop(shutdown.clone()))
            .await;
        assert_eq!(report.forced, 0);
        assert!(report.elapsed < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_listener_exit_triggers_shutdown() {
        let (registry, _task) = registry::spawn();
        let shutdown = CancellationToken::new();
        let coordinator =
            ShutdownCoordinator::new(Duration::from_secs(5), shutdown.clone(), registry);

        let accept_loop = tokio::spawn(async {});
        let report = coordinator
            .run(std::future::pending::<()>(), accept_loop)
            .await;
        assert_eq!(report.trigger, ShutdownTrigger::ListenerExited);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_registrations_refused_after_shutdown() {
        let (registry, _task) = registry::spawn();
        let shutdown = CancellationToken::new();
        let coordinator =
            ShutdownCoordinator::new(Duration::from_secs(1), shutdown.clone(), registry.clone());
        coordinator
            .run(async {}, idle_accept_loop(shutdown.clone()))
            .await;

        let result = registry
            .register(SessionEntry::new(Uuid::new_v4(), peer(), CancellationToken::new()))
            .await;
        assert!(matches!(result, Err(HearthError::ServerClosed)));
    }

    #[test]
    fn test_log_stop_result_accepts_all() {
        log_stop_result(Ok(()));
        log_stop_result(Err(HearthError::ServerClosed));
        log_stop_result(Err(HearthError::internal("boom")));
    }
}
