//! Error types for the chat server
//!
//! Defines application-level errors, directory and configuration errors,
//! and message send errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (reported back to the originating client).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Invite code did not match the configured one
    #[error("Invalid invite code")]
    InvalidInvite,

    /// Alias already registered (or being registered)
    #[error("Alias already taken")]
    NameTaken,

    /// Unknown alias, passwordless account, or wrong password
    #[error("Invalid alias or password")]
    InvalidCredentials,

    /// Alias or password rejected before hashing
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// Connection already has an identity bound
    #[error("Already authenticated")]
    AlreadyAuthenticated,

    /// A register/login for this connection has not completed yet
    #[error("Authentication already in progress")]
    AuthInProgress,

    /// Password hashing failed
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// User directory persistence errors
///
/// Never fatal: the in-memory directory stays authoritative.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid bind address: {0}")]
    InvalidAddr(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Message send errors
///
/// Occurs when queueing a message for a client that is gone or not reading.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client's outbound queue is full
    #[error("Queue full")]
    QueueFull,
}
