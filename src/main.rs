//! Main entry point for the modserve binary.
//!
//! Binds the configured address and serves the store directory until
//! interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use modserve::{ArchiveStore, Cli, ProxyServer, ZipPackager};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !cli.dir.is_dir() {
        warn!(dir = %cli.dir.display(), "store directory does not exist; every request will fail");
    }

    // Binding is the only failure that stops the server.
    let listener = TcpListener::bind(&cli.http)
        .await
        .with_context(|| format!("listening on {}", cli.http))?;
    let addr = listener.local_addr()?;

    let server = ProxyServer::new(ArchiveStore::new(&cli.dir), ZipPackager::new(cli.compression));
    info!(%addr, dir = %cli.dir.display(), compression = ?cli.compression, "serving");

    server
        .serve(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(%err, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
