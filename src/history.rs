//! Bounded per-channel message history
//!
//! Each channel keeps at most `capacity` messages; appending past that
//! evicts the oldest one. Channels are created lazily on first write,
//! up to `max_channels` of them.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::message::ChatMessage;

/// Default number of messages retained per channel
pub const MAX_HISTORY: usize = 100;

/// Default number of distinct channels kept
pub const MAX_CHANNELS: usize = 64;

/// Per-channel FIFO message log
#[derive(Debug)]
pub struct ChannelHistoryStore {
    channels: HashMap<String, VecDeque<ChatMessage>>,
    capacity: usize,
    max_channels: usize,
}

impl ChannelHistoryStore {
    /// Create a store retaining `MAX_HISTORY` messages per channel
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// Create a store retaining `capacity` messages per channel
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limits(capacity, MAX_CHANNELS)
    }

    /// Create a store retaining `capacity` messages in each of at most `max_channels` channels
    pub fn with_limits(capacity: usize, max_channels: usize) -> Self {
        Self {
            channels: HashMap::new(),
            capacity: capacity.max(1),
            max_channels: max_channels.max(1),
        }
    }

    /// Append a message to its channel, evicting the oldest on overflow
    ///
    /// Returns false, storing nothing, if the channel is new and the
    /// channel limit is reached.
    pub fn append(&mut self, channel: &str, message: ChatMessage) -> bool {
        if !self.channels.contains_key(channel) && self.channels.len() >= self.max_channels {
            return false;
        }

        let capacity = self.capacity;
        let log = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        log.push_back(message);
        if log.len() > capacity {
            log.pop_front();
            debug!("Channel '{}' at capacity, evicted oldest message", channel);
        }
        true
    }

    /// Snapshot of a channel's history, oldest first
    ///
    /// Unknown channels yield an empty history.
    pub fn get(&self, channel: &str) -> Vec<ChatMessage> {
        self.channels
            .get(channel)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of messages currently held for a channel
    pub fn len(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, VecDeque::len)
    }
}

impl Default for ChannelHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rank;

    fn msg(channel: &str, body: &str) -> ChatMessage {
        ChatMessage {
            channel: channel.to_string(),
            alias: "Neo".to_string(),
            rank: Rank::Soldier,
            body: body.to_string(),
            timestamp: "12:00".to_string(),
        }
    }

    #[test]
    fn test_unknown_channel_is_empty() {
        let store = ChannelHistoryStore::new();
        assert!(store.get("nowhere").is_empty());
        assert_eq!(store.len("nowhere"), 0);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = ChannelHistoryStore::new();
        store.append("general", msg("general", "one"));
        store.append("general", msg("general", "two"));

        let bodies: Vec<_> = store.get("general").into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, vec!["one", "two"]);
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut store = ChannelHistoryStore::new();
        for i in 0..=MAX_HISTORY {
            store.append("general", msg("general", &i.to_string()));
        }

        let history = store.get("general");
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.first().unwrap().body, "1");
        assert_eq!(history.last().unwrap().body, MAX_HISTORY.to_string());
        assert!(history.iter().all(|m| m.body != "0"));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut store = ChannelHistoryStore::with_capacity(2);
        store.append("general", msg("general", "a"));
        store.append("operations", msg("operations", "b"));
        store.append("operations", msg("operations", "c"));
        store.append("operations", msg("operations", "d"));

        assert_eq!(store.len("general"), 1);
        assert_eq!(store.len("operations"), 2);
    }

    #[test]
    fn test_channel_limit() {
        let mut store = ChannelHistoryStore::with_limits(10, 2);
        assert!(store.append("general", msg("general", "a")));
        assert!(store.append("operations", msg("operations", "b")));
        assert!(!store.append("intel-drops", msg("intel-drops", "c")));
        assert!(store.append("general", msg("general", "d")));

        assert_eq!(store.len("intel-drops"), 0);
        assert_eq!(store.len("general"), 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = ChannelHistoryStore::new();
        store.append("general", msg("general", "a"));

        let mut snapshot = store.get("general");
        snapshot.clear();
        assert_eq!(store.len("general"), 1);
    }
}
