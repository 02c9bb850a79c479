//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Anything that does not
//! parse into a `ClientMessage` is rejected at the connection boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::presence::SystemUpdate;
use crate::typing::TypingEntry;
use crate::types::Rank;

/// Client → Server message
///
/// All messages from client to server. Uses tagged enum with snake_case naming.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a new identity and authenticate as it
    Register {
        alias: String,
        password: String,
        invite_code: String,
    },
    /// Authenticate as an existing identity
    Login { alias: String, password: String },
    /// Post-auth bootstrap request
    Joined,
    /// Request the history of another channel
    SwitchChannel { channel: String },
    /// Post a message to a channel
    ChatMessage { channel: String, body: String },
    /// Indicate typing started in a channel
    TypingStart { channel: String },
    /// Indicate typing stopped
    TypingStop,
}

/// A chat message as stored in history and delivered to clients
///
/// Immutable once stamped by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub channel: String,
    pub alias: String,
    pub rank: Rank,
    pub body: String,
    /// Server receipt time, local `HH:MM`
    pub timestamp: String,
}

impl ChatMessage {
    /// Stamp a new message with the current local wall-clock time
    pub fn stamped(channel: String, alias: String, rank: Rank, body: String) -> Self {
        Self {
            channel,
            alias,
            rank,
            body,
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
        }
    }
}

/// Server → Client message
///
/// All messages from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted, client ID issued
    Connected { client_id: String },
    /// Registration rejected
    RegisterError { message: String },
    /// Registration succeeded, session is now bound
    RegisterSuccess { alias: String, rank: Rank },
    /// Login rejected
    LoginError { message: String },
    /// Login succeeded, session is now bound
    LoginSuccess { alias: String, rank: Rank },
    /// Full history of one channel
    ChannelHistory {
        channel: String,
        history: Vec<ChatMessage>,
    },
    /// A message posted by another client
    ChatMessage(ChatMessage),
    /// Raw per-connection typing map (client ID → alias and channel)
    TypingBroadcast {
        typing: HashMap<String, TypingEntry>,
    },
    /// Full roster with online flags
    SystemUpdate(SystemUpdate),
}

impl ServerMessage {
    /// Report a failed registration to the originating client
    pub fn register_error(err: &AppError) -> Self {
        ServerMessage::RegisterError {
            message: err.to_string(),
        }
    }

    /// Report a failed login to the originating client
    pub fn login_error(err: &AppError) -> Self {
        ServerMessage::LoginError {
            message: err.to_string(),
        }
    }
}
