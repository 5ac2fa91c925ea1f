//! hearth client - opens an interactive session on a hearth server

use hearth_protocol::{ColorDepth, PtyRequest};
use hearth_utils::{init_logging_with_config, LogConfig, Result};

mod app;
mod cli;
mod connection;
mod keys;
mod terminal;

use app::{App, Exit};
use cli::Args;
use terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    // Log to a file, the terminal belongs to the session
    init_logging_with_config(LogConfig::client())?;
    tracing::info!("hearth client starting");
    tracing::debug!("CLI args: {:?}", args);

    match run(args).await {
        Ok(Exit::Closed(reason)) => {
            tracing::info!(%reason, "Server closed the session");
            if reason != "quit" {
                eprintln!("Connection closed: {}", reason);
            }
            Ok(())
        }
        Ok(Exit::InputClosed) => Ok(()),
        Err(e) => {
            tracing::error!("hearth client error: {}", e);
            // Printed after the terminal is restored
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run(args: Args) -> Result<Exit> {
    let (width, height) = Terminal::size()?;
    let term = std::env::var("TERM").ok();
    let colorterm = std::env::var("COLORTERM").ok();
    let pty = PtyRequest {
        width,
        height,
        color: ColorDepth::detect(colorterm.as_deref(), term.as_deref()),
        background: args.background(),
    };

    let (stream, _) = connection::connect(
        &args.addr(),
        term.unwrap_or_else(|| "xterm".into()),
        pty,
    )
    .await?;

    let terminal = Terminal::new()?;
    App::new(stream, terminal).run().await
}
