//! Session supervisor
//!
//! The accept loop hands every connection to its own task, which runs the
//! handshake, negotiates capabilities, registers the session and drives it
//! to completion. Nothing that happens inside a connection task reaches the
//! accept loop or any other session.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, SinkExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use uuid::Uuid;

use hearth_protocol::{ServerMessage, PROTOCOL_VERSION};
use hearth_utils::HearthError;

use crate::negotiate::negotiate;
use crate::registry::{RegistryHandle, SessionEntry};
use crate::session::{SessionExit, SessionRunner};
use crate::transport::{handshake, reject, Handshake, Transport};

/// State shared by the accept loop and every connection task
#[derive(Debug, Clone)]
pub struct SupervisorContext {
    pub registry: RegistryHandle,
    /// Server public key in `authorized_keys` form
    pub host_key: Arc<str>,
    pub handshake_timeout: Duration,
    /// Set once when the server begins shutting down
    pub shutdown: CancellationToken,
}

/// Accept connections until shutdown is signalled
pub async fn run_accept_loop(transport: Transport, ctx: SupervisorContext) {
    loop {
        tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => {
                info!("Shutdown signal received, stopping accept loop");
                break;
            }
            result = transport.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        debug!("New connection from {}", peer);
                        tokio::spawn(serve_connection(stream, peer, ctx.clone()));
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
        }
    }

    // Dropping the transport closes the listening socket
    drop(transport);
}

/// Drive one connection from handshake to teardown
pub async fn serve_connection<T>(io: T, peer: SocketAddr, ctx: SupervisorContext)
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let Handshake {
        term,
        pty,
        mut stream,
    } = match handshake(io, ctx.handshake_timeout).await {
        Ok(hs) => hs,
        Err(e) => {
            log_setup_failure(peer, "Handshake failed", &e);
            return;
        }
    };

    let caps = match negotiate(pty.as_ref()) {
        Ok(caps) => caps,
        Err(e) => {
            info!(%peer, %term, "Connection refused: {}", e);
            reject(&mut stream, &e.to_string()).await;
            return;
        }
    };

    if ctx.shutdown.is_cancelled() {
        reject(&mut stream, "server is shutting down").await;
        return;
    }

    let id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    if let Err(e) = ctx
        .registry
        .register(SessionEntry::new(id, peer, cancel.clone()))
        .await
    {
        log_setup_failure(peer, "Session not started", &e);
        reject(&mut stream, &e.to_string()).await;
        return;
    }

    let started = Instant::now();
    info!(
        session_id = %id,
        %peer,
        %term,
        width = caps.width,
        height = caps.height,
        color = ?caps.color,
        theme = %caps.theme,
        "Session started"
    );

    let welcome = ServerMessage::Welcome {
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: PROTOCOL_VERSION,
        host_key: ctx.host_key.to_string(),
        session_id: id,
    };

    let delivered = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionExit::ForceClosed),
        result = stream.send(welcome) => result.map_err(|e| SessionExit::Io(e.to_string())),
    };

    let exit = match delivered {
        Err(exit) => exit,
        Ok(()) => {
            let runner =
                SessionRunner::new(id, caps.style(), (caps.width, caps.height), stream, cancel);
            match AssertUnwindSafe(runner.run()).catch_unwind().await {
                Ok(exit) => exit,
                Err(_) => {
                    error!(session_id = %id, "Session panicked");
                    SessionExit::Io("session panicked".into())
                }
            }
        }
    };

    ctx.registry.deregister(id).await;

    let duration_ms = started.elapsed().as_millis() as u64;
    if exit.is_error() {
        warn!(session_id = %id, %peer, duration_ms, %exit, "Session ended");
    } else {
        info!(session_id = %id, %peer, duration_ms, %exit, "Session ended");
    }
}

/// Connection-level failures are routine; anything else points at the server
fn setup_failure_level(err: &HearthError) -> Level {
    match err {
        HearthError::ServerClosed => Level::INFO,
        e if e.is_per_connection() => Level::WARN,
        _ => Level::ERROR,
    }
}

fn log_setup_failure(peer: SocketAddr, what: &str, err: &HearthError) {
    let level = setup_failure_level(err);
    if level == Level::ERROR {
        error!(%peer, "{}: {}", what, err);
    } else if level == Level::WARN {
        warn!(%peer, "{}: {}", what, err);
    } else {
        info!(%peer, "{}: {}", what, err);
    }
}
