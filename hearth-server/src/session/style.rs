//! Theme and per-session style

use crossterm::style::{Color, Stylize};
use hearth_protocol::Rgb;

/// Light/dark classification of a client's background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    /// Classify a reported background; unknown backgrounds count as dark
    pub fn from_background(background: Option<Rgb>) -> Self {
        match background {
            Some(rgb) if !rgb.is_dark() => Self::Light,
            _ => Self::Dark,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dark => write!(f, "dark"),
            Self::Light => write!(f, "light"),
        }
    }
}

/// Colors used to draw one session, fixed at session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStyle {
    theme: Theme,
    /// Fill for every cell of the frame
    pub background: Rgb,
    /// Foreground of the greeting
    pub accent: Rgb,
}

impl SessionStyle {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                theme,
                background: Rgb::new(0x6e, 0xa3, 0xff),
                accent: Rgb::new(0xff, 0x83, 0xfc),
            },
            Theme::Light => Self {
                theme,
                background: Rgb::new(0xd6, 0xe4, 0xff),
                accent: Rgb::new(0xb0, 0x1f, 0xa8),
            },
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Text on the background fill
    pub fn fill(&self, text: &str) -> String {
        text.on(color(self.background)).to_string()
    }

    /// Text in the accent color on the background fill
    pub fn emphasis(&self, text: &str) -> String {
        text.with(color(self.accent))
            .on(color(self.background))
            .to_string()
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_dark_background() {
        assert_eq!(Theme::from_background(Some(Rgb::new(0, 0, 0))), Theme::Dark);
        assert_eq!(
            Theme::from_background(Some(Rgb::new(0x28, 0x2a, 0x36))),
            Theme::Dark
        );
    }

    #[test]
    fn test_theme_from_light_background() {
        assert_eq!(
            Theme::from_background(Some(Rgb::new(0xff, 0xff, 0xff))),
            Theme::Light
        );
        assert_eq!(
            Theme::from_background(Some(Rgb::new(0xfd, 0xf6, 0xe3))),
            Theme::Light
        );
    }

    #[test]
    fn test_theme_unknown_background_is_dark() {
        assert_eq!(Theme::from_background(None), Theme::Dark);
    }

    #[test]
    fn test_theme_is_deterministic() {
        let bg = Some(Rgb::new(0x80, 0x80, 0x80));
        let first = Theme::from_background(bg);
        for _ in 0..10 {
            assert_eq!(Theme::from_background(bg), first);
        }
    }

    #[test]
    fn test_style_per_theme() {
        let dark = SessionStyle::for_theme(Theme::Dark);
        let light = SessionStyle::for_theme(Theme::Light);
        assert_eq!(dark.theme(), Theme::Dark);
        assert_eq!(light.theme(), Theme::Light);
        assert_eq!(dark.background, Rgb::new(0x6e, 0xa3, 0xff));
        assert_ne!(dark.background, light.background);
    }

    #[test]
    fn test_fill_keeps_text() {
        let style = SessionStyle::for_theme(Theme::Dark);
        let painted = style.fill("...");
        assert!(painted.contains("..."));
        assert_eq!(strip_ansi_escapes::strip_str(&painted), "...");
    }
}
