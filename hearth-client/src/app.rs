//! Interactive loop: terminal events out, frames in

use crossterm::event::{Event, EventStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, trace, warn};

use hearth_protocol::{ClientMessage, ServerMessage};
use hearth_utils::{HearthError, Result};

use crate::connection::ServerStream;
use crate::keys::key_name;
use crate::terminal::Terminal;

/// Why the interactive loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    /// The server closed the session
    Closed(String),
    /// Local input ended
    InputClosed,
}

pub struct App {
    stream: ServerStream,
    terminal: Terminal,
}

impl App {
    pub fn new(stream: ServerStream, terminal: Terminal) -> Self {
        Self { stream, terminal }
    }

    pub async fn run(mut self) -> Result<Exit> {
        let mut events = EventStream::new();

        let exit = loop {
            tokio::select! {
                msg = self.stream.next() => match msg {
                    Some(Ok(msg)) => {
                        if let Some(exit) = self.on_server(msg)? {
                            break exit;
                        }
                    }
                    Some(Err(e)) => return Err(HearthError::protocol(e.to_string())),
                    None => return Err(HearthError::ConnectionClosed),
                },
                event = events.next() => match event {
                    Some(Ok(event)) => self.on_terminal(event).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        let _ = self.send(ClientMessage::Bye).await;
                        break Exit::InputClosed;
                    }
                },
            }
        };

        info!(?exit, "Session finished");
        Ok(exit)
    }

    fn on_server(&mut self, msg: ServerMessage) -> Result<Option<Exit>> {
        match msg {
            ServerMessage::Frame { content } => {
                trace!(bytes = content.len(), "Frame");
                self.terminal.draw(&content)?;
            }
            ServerMessage::Closed { reason } => return Ok(Some(Exit::Closed(reason))),
            ServerMessage::Pong => {}
            other => warn!("Unexpected message after handshake: {:?}", other),
        }
        Ok(None)
    }

    async fn on_terminal(&mut self, event: Event) -> Result<()> {
        let msg = match event {
            Event::Key(key) => match key_name(&key) {
                Some(key) => ClientMessage::Key { key },
                None => return Ok(()),
            },
            Event::Resize(width, height) => ClientMessage::Resize { width, height },
            Event::Paste(text) => ClientMessage::Paste { text },
            other => {
                debug!("Ignoring terminal event: {:?}", other);
                return Ok(());
            }
        };
        self.send(msg).await
    }

    async fn send(&mut self, msg: ClientMessage) -> Result<()> {
        match self.stream.send(msg).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                warn!("Input not sent: {}", e);
                Ok(())
            }
            Err(e) => Err(HearthError::connection(e.to_string())),
        }
    }
}
