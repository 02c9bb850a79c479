//! Syndicate chat server - Entry Point
//!
//! Loads configuration and the user directory, starts the ChatServer
//! actor and accepts WebSocket connections.

use std::env;
use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use syndicate_chat::{handle_connection, ChatServer, Config, UserDirectory};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=syndicate_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("syndicate_chat=info")),
        )
        .init();

    // Optional TOML config path as the first argument
    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let addr = config.bind_addr()?;

    let directory = UserDirectory::load(&config.directory_path)?;
    info!(
        "User directory {} has {} identities",
        config.directory_path.display(),
        directory.len()
    );

    let listener = TcpListener::bind(addr).await?;
    info!("Syndicate chat server listening on {}", addr);

    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    let server = ChatServer::new(&config, directory, cmd_rx);
    tokio::spawn(server.run());

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("New connection from {}", peer);
                let cmd_tx = cmd_tx.clone();
                let buffer = config.client_buffer;
                let max_frame_bytes = config.max_frame_bytes;

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, buffer, max_frame_bytes).await
                    {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
