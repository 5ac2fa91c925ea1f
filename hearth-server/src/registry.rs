//! Live-session registry
//!
//! A single owner task holds the map of running sessions. Everyone else
//! talks to it through a [`RegistryHandle`], so inserts and removals are
//! serialized without a lock. The live count is published on a watch
//! channel for the shutdown drain.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use hearth_utils::{HearthError, Result};

/// Type alias for session IDs
pub type SessionId = Uuid;

/// Command channel depth
const COMMAND_BUFFER: usize = 256;

/// What the registry keeps for each live session
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub started_at: Instant,
    cancel: CancellationToken,
}

impl SessionEntry {
    pub fn new(id: SessionId, peer: SocketAddr, cancel: CancellationToken) -> Self {
        Self {
            id,
            peer,
            started_at: Instant::now(),
            cancel,
        }
    }
}

enum RegistryCommand {
    Register {
        entry: SessionEntry,
        reply: oneshot::Sender<Result<()>>,
    },
    Deregister {
        id: SessionId,
    },
    Seal {
        reply: oneshot::Sender<usize>,
    },
    CloseAll {
        reply: oneshot::Sender<usize>,
    },
    #[cfg(test)]
    List {
        reply: oneshot::Sender<Vec<SessionId>>,
    },
}

/// Cloneable handle to the registry task
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryCommand>,
    live: watch::Receiver<usize>,
}

impl std::fmt::Debug for RegistryCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register { entry, .. } => write!(f, "Register({})", entry.id),
            Self::Deregister { id } => write!(f, "Deregister({})", id),
            Self::Seal { .. } => write!(f, "Seal"),
            Self::CloseAll { .. } => write!(f, "CloseAll"),
            #[cfg(test)]
            Self::List { .. } => write!(f, "List"),
        }
    }
}

/// Spawn the registry owner task
pub fn spawn() -> (RegistryHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let (live_tx, live_rx) = watch::channel(0);

    let task = tokio::spawn(run(rx, live_tx));
    (RegistryHandle { tx, live: live_rx }, task)
}

async fn run(mut rx: mpsc::Receiver<RegistryCommand>, live: watch::Sender<usize>) {
    let mut sessions: HashMap<SessionId, SessionEntry> = HashMap::new();
    let mut sealed = false;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RegistryCommand::Register { entry, reply } => {
                let result = if sealed {
                    Err(HearthError::ServerClosed)
                } else if sessions.contains_key(&entry.id) {
                    Err(HearthError::internal(format!(
                        "session {} already registered",
                        entry.id
                    )))
                } else {
                    debug!(session_id = %entry.id, peer = %entry.peer, "Session registered");
                    sessions.insert(entry.id, entry);
                    live.send_replace(sessions.len());
                    Ok(())
                };
                let _ = reply.send(result);
            }
            RegistryCommand::Deregister { id } => match sessions.remove(&id) {
                Some(entry) => {
                    live.send_replace(sessions.len());
                    debug!(
                        session_id = %id,
                        lifetime_ms = entry.started_at.elapsed().as_millis() as u64,
                        "Session deregistered"
                    );
                }
                None => warn!(session_id = %id, "Deregister for unknown session"),
            },
            RegistryCommand::Seal { reply } => {
                sealed = true;
                let _ = reply.send(sessions.len());
            }
            RegistryCommand::CloseAll { reply } => {
                for entry in sessions.values() {
                    // Cancelling a session that is already on its way out is a no-op
                    entry.cancel.cancel();
                }
                if !sessions.is_empty() {
                    info!("Force closing {} session(s)", sessions.len());
                }
                let _ = reply.send(sessions.len());
            }
            #[cfg(test)]
            RegistryCommand::List { reply } => {
                let _ = reply.send(sessions.keys().copied().collect());
            }
        }
    }

    debug!("Registry task stopped");
}

impl RegistryHandle {
    async fn call<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> RegistryCommand) -> Result<R> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| HearthError::internal("registry task is gone"))?;
        rx.await
            .map_err(|_| HearthError::internal("registry task dropped the reply"))
    }

    /// Add a session. Fails once the registry is sealed.
    pub async fn register(&self, entry: SessionEntry) -> Result<()> {
        self.call(|reply| RegistryCommand::Register { entry, reply })
            .await?
    }

    /// Remove a session; unknown ids are logged and ignored
    pub async fn deregister(&self, id: SessionId) {
        if self.tx.send(RegistryCommand::Deregister { id }).await.is_err() {
            warn!(session_id = %id, "Registry task gone during deregister");
        }
    }

    /// Refuse all further registrations. Returns the live count at the
    /// moment of sealing; every registration queued earlier is included.
    pub async fn seal(&self) -> Result<usize> {
        self.call(|reply| RegistryCommand::Seal { reply }).await
    }

    /// Cancel every live session, returning how many were signalled
    pub async fn close_all(&self) -> Result<usize> {
        self.call(|reply| RegistryCommand::CloseAll { reply }).await
    }

    /// Ids of all live sessions
    #[cfg(test)]
    pub async fn list(&self) -> Result<Vec<SessionId>> {
        self.call(|reply| RegistryCommand::List { reply }).await
    }

    /// Live session count as of the last processed command
    pub fn live_count(&self) -> usize {
        *self.live.borrow()
    }

    /// Resolve once no sessions are live
    pub async fn wait_empty(&self) {
        let mut live = self.live.clone();
        // A closed channel means the registry is gone, so nothing is live
        let _ = live.wait_for(|count| *count == 0).await;
    }
}
