//! hearth server - serves an interactive screen to every connected terminal

use tracing::{error, info};

use hearth_utils::{LogConfig, Result};

mod config;
mod host_key;
mod negotiate;
mod registry;
mod server;
mod session;
mod shutdown;
mod supervisor;
mod transport;

#[cfg(test)]
mod tests;

use config::ConfigLoader;
use host_key::HostKey;
use server::Server;

async fn run() -> Result<()> {
    let config = ConfigLoader::load()?;
    let host_key = HostKey::load(&config.host_key_path)?;
    info!(algorithm = host_key.algorithm(), "Host key loaded");

    // Sessions always draw in 24-bit color
    crossterm::style::force_color_output(true);

    info!(host = %config.host, port = config.port, "Starting hearth server");
    let server = Server::bind(&config, host_key).await?;
    if let Ok(addr) = server.local_addr() {
        info!(%addr, "Accepting connections");
    }

    let report = server.serve(shutdown::wait_for_signal()).await;
    info!(
        trigger = ?report.trigger,
        forced = report.forced,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "hearth server stopped"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    hearth_utils::init_logging_with_config(LogConfig::server())?;

    if let Err(e) = run().await {
        error!("Could not start server: {}", e);
        return Err(e);
    }
    Ok(())
}
