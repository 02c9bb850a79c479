//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers and small closed enumerations:
//! - `ClientId`: UUID-based unique connection identifier
//! - `Rank`: fixed set of identity ranks

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rank attached to every identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Architect,
    Enforcer,
    /// Rank given to every newly registered identity
    #[default]
    Soldier,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rank::Architect => "architect",
            Rank::Enforcer => "enforcer",
            Rank::Soldier => "soldier",
        };
        f.write_str(name)
    }
}

/// An authenticated identity bound to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub alias: String,
    pub rank: Rank,
}

impl Identity {
    pub fn new(alias: impl Into<String>, rank: Rank) -> Self {
        Self {
            alias: alias.into(),
            rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_unique() {
        let id1 = ClientId::new();
        let id2 = ClientId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_default_rank_is_soldier() {
        assert_eq!(Rank::default(), Rank::Soldier);
    }

    #[test]
    fn test_rank_serializes_lowercase() {
        let json = serde_json::to_string(&Rank::Architect).unwrap();
        assert_eq!(json, "\"architect\"");
        let rank: Rank = serde_json::from_str("\"enforcer\"").unwrap();
        assert_eq!(rank, Rank::Enforcer);
        assert_eq!(Rank::Soldier.to_string(), "soldier");
    }
}
