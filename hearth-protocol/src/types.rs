//! Shared data types carried inside protocol messages

use serde::{Deserialize, Serialize};

/// 24-bit color as reported by a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` hex string
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// HSL lightness in the range `0.0..=1.0`
    pub fn lightness(&self) -> f32 {
        let max = self.r.max(self.g).max(self.b) as f32;
        let min = self.r.min(self.g).min(self.b) as f32;
        (max + min) / 2.0 / 255.0
    }

    /// Whether this color reads as a dark background
    pub fn is_dark(&self) -> bool {
        self.lightness() < 0.5
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Color depth a terminal claims to support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorDepth {
    /// No color escapes at all
    Monochrome,
    /// The 16 standard ANSI colors
    Ansi16,
    /// The xterm 256 color palette
    Ansi256,
    /// 24-bit RGB
    TrueColor,
}

impl ColorDepth {
    /// Whether the terminal can display arbitrary RGB colors
    pub fn is_full_color(&self) -> bool {
        matches!(self, Self::TrueColor)
    }

    /// Guess the color depth from `COLORTERM` / `TERM` style values
    pub fn detect(colorterm: Option<&str>, term: Option<&str>) -> Self {
        if let Some(ct) = colorterm {
            let ct = ct.to_ascii_lowercase();
            if ct == "truecolor" || ct == "24bit" {
                return Self::TrueColor;
            }
        }
        match term {
            Some("dumb") | None => Self::Monochrome,
            Some(t) if t.contains("256color") => Self::Ansi256,
            Some(_) => Self::Ansi16,
        }
    }
}

/// Pseudo-terminal attached to a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtyRequest {
    /// Terminal width in columns
    pub width: u16,
    /// Terminal height in rows
    pub height: u16,
    /// Supported color depth
    pub color: ColorDepth,
    /// Background color, if the client could query it
    pub background: Option<Rgb>,
}
