//! Session model and the pure update function

use hearth_protocol::ClientMessage;

use super::style::SessionStyle;

/// Terminal events a session reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Viewport changed size
    Resize { width: u16, height: u16 },
    /// Named key press (`q`, `ctrl+c`, `enter`, ...)
    Key(String),
    /// Anything else the terminal sent
    Other,
}

impl From<ClientMessage> for Event {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Resize { width, height } => Self::Resize { width, height },
            ClientMessage::Key { key } => Self::Key(key),
            _ => Self::Other,
        }
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Closed,
}

/// Side effects requested by [`Model::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Tear down this session
    Quit,
}

/// Keys that end a session
pub fn is_quit_key(key: &str) -> bool {
    matches!(key, "q" | "ctrl+c")
}

/// Visible state of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub width: u16,
    pub height: u16,
    pub style: SessionStyle,
    pub status: Status,
}

impl Model {
    /// Initial state: empty viewport, no initial command
    pub fn init(style: SessionStyle) -> (Self, Option<Command>) {
        let model = Self {
            width: 0,
            height: 0,
            style,
            status: Status::Running,
        };
        (model, None)
    }

    /// Apply one event. A closed model ignores everything.
    pub fn update(mut self, event: &Event) -> (Self, Option<Command>) {
        if self.status == Status::Closed {
            return (self, None);
        }

        match event {
            Event::Resize { width, height } => {
                self.width = *width;
                self.height = *height;
                (self, None)
            }
            Event::Key(key) if is_quit_key(key) => {
                self.status = Status::Closed;
                (self, Some(Command::Quit))
            }
            Event::Key(_) | Event::Other => (self, None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }
}
