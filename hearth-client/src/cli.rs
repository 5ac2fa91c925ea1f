//! Command-line argument parsing for the hearth client

use clap::Parser;

use hearth_protocol::Rgb;

/// hearth - connect to a hearth server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server host
    #[arg(long, env = "HEARTH_HOST", default_value = "localhost")]
    pub host: String,

    /// Server port
    #[arg(long, short = 'p', env = "HEARTH_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Report a light terminal background
    #[arg(long, conflicts_with = "background")]
    pub light: bool,

    /// Report an explicit background color (`#rrggbb`)
    #[arg(long, value_parser = parse_rgb)]
    pub background: Option<Rgb>,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Server address in `host:port` form
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Background reported in the handshake. Unknown unless asked for.
    pub fn background(&self) -> Option<Rgb> {
        if self.light {
            Some(Rgb::new(0xff, 0xff, 0xff))
        } else {
            self.background
        }
    }
}

fn parse_rgb(value: &str) -> Result<Rgb, String> {
    Rgb::from_hex(value).ok_or_else(|| format!("invalid color '{}', expected #rrggbb", value))
}
