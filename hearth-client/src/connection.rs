//! Connection to a hearth server
//!
//! Opens the TCP stream, performs the `Hello` handshake and hands back the
//! framed stream once the server has welcomed the session.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use hearth_protocol::{ClientCodec, ClientMessage, PtyRequest, ServerMessage, PROTOCOL_VERSION};
use hearth_utils::{HearthError, Result};

/// Framed stream to the server
pub type ServerStream = Framed<TcpStream, ClientCodec>;

/// Time allowed for the server to answer the handshake
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// What the server said when it accepted the session
#[derive(Debug, Clone)]
pub struct Welcome {
    pub server_version: String,
    pub host_key: String,
    pub session_id: String,
}

/// Connect to `addr` and complete the handshake
pub async fn connect(addr: &str, term: String, pty: PtyRequest) -> Result<(ServerStream, Welcome)> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| HearthError::connection(format!("{}: {}", addr, e)))?;
    stream.set_nodelay(true)?;
    debug!(addr, "Connected");

    let mut stream = Framed::new(stream, ClientCodec::new());
    let welcome = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut stream, term, pty))
        .await
        .map_err(|_| HearthError::HandshakeTimeout {
            seconds: HANDSHAKE_TIMEOUT.as_secs(),
        })??;

    info!(
        session_id = %welcome.session_id,
        server_version = %welcome.server_version,
        host_key = %welcome.host_key,
        "Session accepted"
    );
    Ok((stream, welcome))
}

async fn handshake(stream: &mut ServerStream, term: String, pty: PtyRequest) -> Result<Welcome> {
    stream
        .send(ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            term,
            pty: Some(pty),
        })
        .await
        .map_err(|e| HearthError::protocol(e.to_string()))?;

    match stream.next().await {
        Some(Ok(ServerMessage::Welcome {
            server_version,
            protocol_version,
            host_key,
            session_id,
        })) => {
            if protocol_version != PROTOCOL_VERSION {
                return Err(HearthError::ProtocolMismatch {
                    client: PROTOCOL_VERSION,
                    server: protocol_version,
                });
            }
            Ok(Welcome {
                server_version,
                host_key,
                session_id: session_id.to_string(),
            })
        }
        Some(Ok(ServerMessage::Rejected { reason })) => Err(HearthError::connection(format!(
            "server refused the session: {}",
            reason
        ))),
        Some(Ok(other)) => Err(HearthError::protocol(format!(
            "unexpected handshake reply: {:?}",
            other
        ))),
        Some(Err(e)) => Err(HearthError::protocol(e.to_string())),
        None => Err(HearthError::ConnectionClosed),
    }
}
