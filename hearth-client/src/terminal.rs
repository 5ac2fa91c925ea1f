//! Terminal initialization and cleanup
//!
//! Raw mode and the alternate screen are held for the lifetime of
//! [`Terminal`] and restored on drop.

use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute, queue,
    style::{Print, ResetColor},
    terminal::{
        self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};

use hearth_utils::Result;

/// Terminal wrapper that handles initialization and cleanup
pub struct Terminal {
    stdout: Stdout,
}

impl Terminal {
    /// Enter raw mode and the alternate screen
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste, Hide) {
            let _ = Self::restore();
            return Err(e.into());
        }

        Ok(Self { stdout })
    }

    /// Terminal size (columns, rows)
    pub fn size() -> Result<(u16, u16)> {
        Ok(terminal::size()?)
    }

    /// Replace the screen with a rendered frame
    pub fn draw(&mut self, frame: &str) -> Result<()> {
        queue!(
            self.stdout,
            ResetColor,
            Clear(ClearType::All),
            MoveTo(0, 0),
            Print(raw_lines(frame))
        )?;
        self.stdout.flush()?;
        Ok(())
    }

    fn restore() -> Result<()> {
        disable_raw_mode()?;
        execute!(
            io::stdout(),
            ResetColor,
            Show,
            DisableBracketedPaste,
            LeaveAlternateScreen
        )?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(e) = Self::restore() {
            tracing::error!("Failed to restore terminal: {}", e);
        }
    }
}

/// Raw mode does not translate `\n`, so every row break needs a carriage return
fn raw_lines(frame: &str) -> String {
    frame.replace("\r\n", "\n").replace('\n', "\r\n")
}
