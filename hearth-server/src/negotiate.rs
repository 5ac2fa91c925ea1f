//! Terminal capability negotiation

use hearth_protocol::{ColorDepth, PtyRequest};
use hearth_utils::{HearthError, Result};

use crate::session::{SessionStyle, Theme};

/// What a connection's terminal can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub width: u16,
    pub height: u16,
    pub color: ColorDepth,
    pub theme: Theme,
}

impl Capabilities {
    pub fn style(&self) -> SessionStyle {
        SessionStyle::for_theme(self.theme)
    }
}

/// Require an attached terminal and read its capabilities
pub fn negotiate(pty: Option<&PtyRequest>) -> Result<Capabilities> {
    let pty = pty.ok_or_else(|| HearthError::capability("an interactive terminal is required"))?;

    Ok(Capabilities {
        width: pty.width,
        height: pty.height,
        color: pty.color,
        theme: Theme::from_background(pty.background),
    })
}
