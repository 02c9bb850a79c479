//! Multi-channel WebSocket group chat server
//!
//! Coordinates realtime group messaging among concurrently connected
//! sessions: bounded per-channel history, online presence, typing
//! indicators, and one authenticated identity per connection.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning all shared state
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - all state access goes through message passing
//! - Password hashing runs on the blocking pool and re-enters the actor
//!   as an internal message, so other connections keep being served
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use syndicate_chat::{handle_connection, ChatServer, Config, UserDirectory};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let directory = UserDirectory::load(&config.directory_path).unwrap();
//!     let listener = TcpListener::bind(config.bind_addr().unwrap()).await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
//!
//!     tokio::spawn(ChatServer::new(&config, directory, cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(
//!             stream,
//!             cmd_tx,
//!             config.client_buffer,
//!             config.max_frame_bytes,
//!         ));
//!     }
//! }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod handler;
pub mod history;
pub mod message;
pub mod presence;
pub mod server;
pub mod session;
pub mod types;
pub mod typing;

// Re-export main types for convenience
pub use config::Config;
pub use directory::{IdentityRecord, UserDirectory};
pub use error::{AppError, ConfigError, DirectoryError, SendError};
pub use handler::handle_connection;
pub use history::{ChannelHistoryStore, MAX_CHANNELS, MAX_HISTORY};
pub use message::{ChatMessage, ClientMessage, ServerMessage};
pub use presence::{PresenceTracker, RosterEntry, SystemUpdate};
pub use server::{ChatServer, ServerCommand};
pub use session::{Session, SessionRegistry};
pub use types::{ClientId, Identity, Rank};
pub use typing::{TypingEntry, TypingIndicatorTracker};
