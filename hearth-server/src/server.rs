//! Server assembly: listener, registry, supervisor and shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hearth_utils::Result;

use crate::config::ServerConfig;
use crate::host_key::HostKey;
use crate::registry::{self, RegistryHandle};
use crate::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::supervisor::{run_accept_loop, SupervisorContext};
use crate::transport::Transport;

/// A bound server that has not started serving yet
pub struct Server {
    transport: Transport,
    registry: RegistryHandle,
    registry_task: JoinHandle<()>,
    host_key: HostKey,
    drain_timeout: Duration,
    handshake_timeout: Duration,
}

impl Server {
    /// Bind the listener and start the registry
    pub async fn bind(config: &ServerConfig, host_key: HostKey) -> Result<Self> {
        let transport = Transport::bind(&config.bind_addr()).await?;
        let (registry, registry_task) = registry::spawn();

        Ok(Self {
            transport,
            registry,
            registry_task,
            host_key,
            drain_timeout: config.drain_timeout(),
            handshake_timeout: config.handshake_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    #[cfg(test)]
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    #[cfg(test)]
    pub fn set_drain_timeout(&mut self, drain_timeout: Duration) {
        self.drain_timeout = drain_timeout;
    }

    /// Serve until `signal` resolves, then drain and return
    pub async fn serve<F>(self, signal: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        let shutdown = CancellationToken::new();
        let ctx = SupervisorContext {
            registry: self.registry.clone(),
            host_key: Arc::from(self.host_key.public_key_openssh()),
            handshake_timeout: self.handshake_timeout,
            shutdown: shutdown.clone(),
        };

        let accept_loop = tokio::spawn(run_accept_loop(self.transport, ctx));
        let coordinator = ShutdownCoordinator::new(self.drain_timeout, shutdown, self.registry);
        let report = coordinator.run(signal, accept_loop).await;

        // The registry stops once every handle is gone
        self.registry_task.abort();
        debug!("Registry task released");

        report
    }
}
