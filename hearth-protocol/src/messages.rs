//! Client and server message definitions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::PtyRequest;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Opening handshake, must be the first message on a connection
    Hello {
        protocol_version: u32,
        /// Value of the client's `TERM`
        term: String,
        /// Attached pseudo-terminal, if any
        pty: Option<PtyRequest>,
    },

    /// Terminal was resized
    Resize { width: u16, height: u16 },

    /// A key was pressed, named like `q`, `ctrl+c`, `enter`, `up`
    Key { key: String },

    /// Bracketed paste
    Paste { text: String },

    /// Keepalive
    Ping,

    /// Client is going away
    Bye,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted, a session was created
    Welcome {
        server_version: String,
        protocol_version: u32,
        /// Server host key in `authorized_keys` form
        host_key: String,
        session_id: Uuid,
    },

    /// Handshake refused, the connection will be closed
    Rejected { reason: String },

    /// A complete rendered screen
    Frame { content: String },

    /// Keepalive response
    Pong,

    /// Session ended, the connection will be closed
    Closed { reason: String },
}

impl ClientMessage {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Resize { .. } => "resize",
            Self::Key { .. } => "key",
            Self::Paste { .. } => "paste",
            Self::Ping => "ping",
            Self::Bye => "bye",
        }
    }
}
