//! Typing indicator tracking
//!
//! One entry per connection that is currently composing a message.
//! The broadcast payload is the raw per-connection map; receivers
//! filter by channel themselves.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::ClientId;

/// Who is typing, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingEntry {
    pub alias: String,
    pub channel: String,
}

#[derive(Debug, Default)]
pub struct TypingIndicatorTracker {
    typing: HashMap<ClientId, TypingEntry>,
}

impl TypingIndicatorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the typing entry for a connection
    ///
    /// A new channel overwrites the previous one.
    pub fn set_typing(&mut self, client_id: ClientId, alias: String, channel: String) {
        self.typing.insert(client_id, TypingEntry { alias, channel });
    }

    /// Remove a connection's entry; returns true if one existed
    pub fn clear_typing(&mut self, client_id: ClientId) -> bool {
        self.typing.remove(&client_id).is_some()
    }

    pub fn is_typing(&self, client_id: ClientId) -> bool {
        self.typing.contains_key(&client_id)
    }

    /// Full map keyed by the connection ID string
    pub fn snapshot(&self) -> HashMap<String, TypingEntry> {
        self.typing
            .iter()
            .map(|(id, entry)| (id.to_string(), entry.clone()))
            .collect()
    }
}
