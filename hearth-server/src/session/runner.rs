//! Session event loop
//!
//! Reads client messages one at a time, feeds them through [`Model::update`]
//! and writes a fresh frame after each. Nothing here is shared with other
//! sessions; the only outside influence is the cancellation token.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use hearth_protocol::{ClientMessage, ServerCodec, ServerMessage};

use super::model::{Command, Event, Model};
use super::style::SessionStyle;
use super::view::view;

/// How long a force-closed session may spend telling the client why
const FAREWELL_TIMEOUT: Duration = Duration::from_millis(250);

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExit {
    /// Client pressed a quit key
    Quit,
    /// Client hung up or said goodbye
    Disconnected,
    /// Server shut the session down
    ForceClosed,
    /// Reading or writing the connection failed
    Io(String),
}

impl SessionExit {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl std::fmt::Display for SessionExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quit => write!(f, "quit"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::ForceClosed => write!(f, "force closed"),
            Self::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

/// Runs one session's model against its connection
pub struct SessionRunner<T> {
    id: Uuid,
    model: Model,
    stream: Framed<T, ServerCodec>,
    cancel: CancellationToken,
    initial_size: (u16, u16),
}

impl<T> SessionRunner<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        id: Uuid,
        style: SessionStyle,
        initial_size: (u16, u16),
        stream: Framed<T, ServerCodec>,
        cancel: CancellationToken,
    ) -> Self {
        let (model, _) = Model::init(style);
        Self {
            id,
            model,
            stream,
            cancel,
            initial_size,
        }
    }

    /// Run until the session closes. The connection is dropped on return.
    pub async fn run(mut self) -> SessionExit {
        let exit = self.event_loop().await;

        if exit == SessionExit::ForceClosed {
            let farewell = ServerMessage::Closed {
                reason: "server shutting down".into(),
            };
            if tokio::time::timeout(FAREWELL_TIMEOUT, self.stream.send(farewell))
                .await
                .is_err()
            {
                debug!(session_id = %self.id, "Client did not take the farewell in time");
            }
        }

        exit
    }

    async fn event_loop(&mut self) -> SessionExit {
        if let Err(exit) = self.render().await {
            return exit;
        }

        // The negotiated size arrives as an ordinary resize, after init
        let (width, height) = self.initial_size;
        if let Some(exit) = self.handle(Event::Resize { width, height }).await {
            return exit;
        }

        loop {
            let msg = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SessionExit::ForceClosed,
                msg = self.stream.next() => msg,
            };

            match msg {
                None | Some(Ok(ClientMessage::Bye)) => return SessionExit::Disconnected,
                Some(Err(e)) => return SessionExit::Io(e.to_string()),
                Some(Ok(ClientMessage::Ping)) => {
                    if let Err(exit) = self.send(ServerMessage::Pong).await {
                        return exit;
                    }
                }
                Some(Ok(msg)) => {
                    trace!(session_id = %self.id, kind = msg.kind(), "Event");
                    if let Some(exit) = self.handle(Event::from(msg)).await {
                        return exit;
                    }
                }
            }
        }
    }

    /// Apply one event; returns the exit reason if the session is done
    async fn handle(&mut self, event: Event) -> Option<SessionExit> {
        let (model, command) = self.model.clone().update(&event);
        self.model = model;

        match command {
            Some(Command::Quit) => {
                let bye = ServerMessage::Closed {
                    reason: "quit".into(),
                };
                if let Err(exit) = self.send(bye).await {
                    debug!(session_id = %self.id, %exit, "Could not confirm quit");
                }
                Some(SessionExit::Quit)
            }
            None => self.render().await.err(),
        }
    }

    async fn render(&mut self) -> Result<(), SessionExit> {
        let content = view(&self.model);
        self.send(ServerMessage::Frame { content }).await
    }

    async fn send(&mut self, msg: ServerMessage) -> Result<(), SessionExit> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionExit::ForceClosed),
            result = self.stream.send(msg) => result.map_err(|e| SessionExit::Io(e.to_string())),
        }
    }
}
