//! Online presence tracking
//!
//! Tracks which identities have at least one bound session. Presence is
//! reference-counted per alias, so closing one of several sessions for
//! the same identity leaves it online.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directory::UserDirectory;
use crate::types::{Identity, Rank};

/// One roster line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub alias: String,
    pub rank: Rank,
    pub online: bool,
}

/// Presence broadcast payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemUpdate {
    /// Number of identities in the directory
    pub total_identities: usize,
    /// Every identity, administrator first, then by alias
    pub roster: Vec<RosterEntry>,
    /// Online aliases in roster order
    pub online_names: Vec<String>,
}

#[derive(Debug)]
struct OnlineEntry {
    rank: Rank,
    sessions: usize,
}

/// Set of online identities
#[derive(Debug, Default)]
pub struct PresenceTracker {
    online: HashMap<String, OnlineEntry>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more session for an identity
    ///
    /// Returns true if the identity just came online.
    pub fn mark_online(&mut self, identity: &Identity) -> bool {
        let entry = self
            .online
            .entry(identity.alias.clone())
            .or_insert(OnlineEntry {
                rank: identity.rank,
                sessions: 0,
            });
        entry.rank = identity.rank;
        entry.sessions += 1;

        debug!(
            "Presence: '{}' online ({} sessions)",
            identity.alias, entry.sessions
        );
        entry.sessions == 1
    }

    /// Drop one session for an identity
    ///
    /// Returns true if the identity just went offline. Unknown aliases are a no-op.
    pub fn mark_offline(&mut self, alias: &str) -> bool {
        let Some(entry) = self.online.get_mut(alias) else {
            return false;
        };

        entry.sessions = entry.sessions.saturating_sub(1);
        if entry.sessions > 0 {
            debug!("Presence: '{}' still has {} sessions", alias, entry.sessions);
            return false;
        }

        self.online.remove(alias);
        debug!("Presence: '{}' offline", alias);
        true
    }

    pub fn is_online(&self, alias: &str) -> bool {
        self.online.contains_key(alias)
    }

    /// Number of distinct online identities
    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Build the full roster from the directory, annotated with online flags
    ///
    /// `admin_alias` always sorts first; everything else by case-sensitive alias.
    pub fn snapshot(&self, directory: &UserDirectory, admin_alias: &str) -> SystemUpdate {
        let mut roster: Vec<RosterEntry> = directory
            .iter()
            .map(|(alias, record)| RosterEntry {
                alias: alias.clone(),
                rank: record.rank,
                online: self.is_online(alias),
            })
            .collect();

        roster.sort_by(|a, b| {
            (a.alias != admin_alias)
                .cmp(&(b.alias != admin_alias))
                .then_with(|| a.alias.cmp(&b.alias))
        });

        let online_names = roster
            .iter()
            .filter(|entry| entry.online)
            .map(|entry| entry.alias.clone())
            .collect();

        SystemUpdate {
            total_identities: directory.len(),
            roster,
            online_names,
        }
    }
}
