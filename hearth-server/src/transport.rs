//! TCP transport and opening handshake

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{debug, info};

use hearth_protocol::{ClientMessage, PtyRequest, ServerCodec, ServerMessage, PROTOCOL_VERSION};
use hearth_utils::{HearthError, Result};

/// Listening socket
pub struct Transport {
    listener: TcpListener,
}

impl Transport {
    /// Bind the listener. Failure here is fatal to the server.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| HearthError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

        if let Ok(local) = listener.local_addr() {
            info!("TCP listener bound to {}", local);
        }

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        // Frames are small and latency sensitive
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }
        Ok((stream, peer))
    }
}

/// A client that completed the opening handshake
pub struct Handshake<T> {
    pub term: String,
    pub pty: Option<PtyRequest>,
    pub stream: Framed<T, ServerCodec>,
}

/// Wait for the client's `Hello` and check its protocol version
pub async fn handshake<T>(io: T, timeout: Duration) -> Result<Handshake<T>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = Framed::new(io, ServerCodec::new());

    let first = tokio::time::timeout(timeout, stream.next())
        .await
        .map_err(|_| HearthError::HandshakeTimeout {
            seconds: timeout.as_secs(),
        })?;

    let msg = match first {
        None => return Err(HearthError::ConnectionClosed),
        Some(Err(e)) => return Err(HearthError::protocol(e.to_string())),
        Some(Ok(msg)) => msg,
    };

    match msg {
        ClientMessage::Hello {
            protocol_version,
            term,
            pty,
        } => {
            if protocol_version != PROTOCOL_VERSION {
                let err = HearthError::ProtocolMismatch {
                    client: protocol_version,
                    server: PROTOCOL_VERSION,
                };
                reject(&mut stream, &err.to_string()).await;
                return Err(err);
            }
            Ok(Handshake { term, pty, stream })
        }
        other => Err(HearthError::protocol(format!(
            "expected hello, got {}",
            other.kind()
        ))),
    }
}

/// Best-effort rejection notice before the connection is dropped
pub async fn reject<T>(stream: &mut Framed<T, ServerCodec>, reason: &str)
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let msg = ServerMessage::Rejected {
        reason: reason.to_string(),
    };
    if let Err(e) = stream.send(msg).await {
        debug!("Failed to deliver rejection: {}", e);
    }
}
