//! Frame rendering
//!
//! Layout follows the usual "place" model: a block of styled lines is
//! padded with a whitespace pattern until it fills a target box, using
//! visible (escape-free) cell widths for all measurements.

use strip_ansi_escapes::strip_str;
use unicode_width::UnicodeWidthStr;

use super::model::Model;
use super::style::SessionStyle;

/// Width of the inner band holding the greeting
pub const BAND_WIDTH: usize = 20;

/// Text shown in every session
pub const GREETING: &str = "hello";

/// Fill pattern inside the band
const BAND_FILL: char = '/';

/// Fill pattern for the rest of the viewport
const SCREEN_FILL: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Start,
    Center,
    End,
}

/// Render a model into one printable frame, lines separated by `\n`
pub fn view(model: &Model) -> String {
    let style = &model.style;

    let band = place_horizontal(
        BAND_WIDTH,
        Position::Center,
        &style.emphasis(GREETING),
        Whitespace::new(BAND_FILL, style),
    );

    let screen_fill = Whitespace::new(SCREEN_FILL, style);
    let screen = place_vertical(
        usize::from(model.height),
        Position::Start,
        &place_horizontal(usize::from(model.width), Position::Center, &band, screen_fill),
        screen_fill,
    );

    screen
        .split('\n')
        .map(|line| style.fill(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone, Copy)]
struct Whitespace<'a> {
    ch: char,
    style: &'a SessionStyle,
}

impl<'a> Whitespace<'a> {
    fn new(ch: char, style: &'a SessionStyle) -> Self {
        Self { ch, style }
    }

    fn render(&self, width: usize) -> String {
        if width == 0 {
            return String::new();
        }
        let run: String = std::iter::repeat(self.ch).take(width).collect();
        self.style.fill(&run)
    }
}

fn visible_width(line: &str) -> usize {
    strip_str(line).width()
}

/// Split `total` padding cells into (before, after)
fn split_gap(total: usize, position: Position) -> (usize, usize) {
    match position {
        Position::Start => (0, total),
        Position::End => (total, 0),
        Position::Center => {
            let after = (total + 1) / 2;
            (total - after, after)
        }
    }
}

fn place_horizontal(width: usize, position: Position, content: &str, ws: Whitespace<'_>) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let content_width = lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    if width <= content_width {
        return content.to_string();
    }

    let gap = width - content_width;
    lines
        .iter()
        .map(|line| {
            let short = content_width - visible_width(line);
            let (left, right) = split_gap(gap + short, position);
            format!("{}{}{}", ws.render(left), line, ws.render(right))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn place_vertical(height: usize, position: Position, content: &str, ws: Whitespace<'_>) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    if height <= lines.len() {
        return content.to_string();
    }

    let width = lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    let empty = ws.render(width);
    let (top, bottom) = split_gap(height - lines.len(), position);

    let mut out = Vec::with_capacity(height);
    out.extend(std::iter::repeat(empty.as_str()).take(top));
    out.extend(lines.iter().copied());
    out.extend(std::iter::repeat(empty.as_str()).take(bottom));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::Event;
    use crate::session::Theme;

    fn model(width: u16, height: u16, theme: Theme) -> Model {
        let (model, _) = Model::init(SessionStyle::for_theme(theme));
        model.update(&Event::Resize { width, height }).0
    }

    fn visible_lines(frame: &str) -> Vec<String> {
        strip_str(frame).split('\n').map(String::from).collect()
    }

    const BAND: &str = "///////hello////////";

    #[test]
    fn test_split_gap() {
        assert_eq!(split_gap(15, Position::Center), (7, 8));
        assert_eq!(split_gap(14, Position::Center), (7, 7));
        assert_eq!(split_gap(0, Position::Center), (0, 0));
        assert_eq!(split_gap(4, Position::Start), (0, 4));
        assert_eq!(split_gap(4, Position::End), (4, 0));
    }

    #[test]
    fn test_initial_frame_is_band() {
        let (model, _) = Model::init(SessionStyle::for_theme(Theme::Dark));
        let lines = visible_lines(&view(&model));
        assert_eq!(lines, vec![BAND.to_string()]);
        assert_eq!(lines[0].len(), BAND_WIDTH);
    }

    #[test]
    fn test_band_centered_in_viewport() {
        let lines = visible_lines(&view(&model(80, 24, Theme::Dark)));
        assert_eq!(lines.len(), 24);
        assert!(lines.iter().all(|l| l.width() == 80));

        let expected_top = format!("{}{}{}", ".".repeat(30), BAND, ".".repeat(30));
        assert_eq!(lines[0], expected_top);
        assert!(lines[1..].iter().all(|l| *l == ".".repeat(80)));
    }

    #[test]
    fn test_odd_gap_leans_right() {
        let lines = visible_lines(&view(&model(25, 2, Theme::Dark)));
        assert_eq!(lines[0], format!("..{}...", BAND));
    }

    #[test]
    fn test_viewport_narrower_than_band() {
        let lines = visible_lines(&view(&model(10, 3, Theme::Light)));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], BAND);
        assert_eq!(lines[1], ".".repeat(BAND_WIDTH));
    }

    #[test]
    fn test_render_is_pure() {
        let model = model(100, 30, Theme::Dark);
        let before = model.clone();
        let first = view(&model);
        let second = view(&model);
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(model, before);
    }

    #[test]
    fn test_themes_render_differently() {
        crossterm::style::force_color_output(true);
        let dark = view(&model(40, 2, Theme::Dark));
        let light = view(&model(40, 2, Theme::Light));
        assert_ne!(dark, light);
        assert_eq!(visible_lines(&dark), visible_lines(&light));
        assert!(dark.contains("48;2;110;163;255"));
    }
}
