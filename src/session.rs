//! Sessions and the session registry
//!
//! A `Session` lives exactly as long as one connection and carries at
//! most one authenticated identity. The registry owns every session and
//! is the only place broadcasts fan out from.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ClientId, Identity};

/// Connected client state
///
/// Holds the connection's unique ID, its outbound message channel and
/// its authentication state.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
    /// Bound identity (None until authenticated, then fixed)
    identity: Option<Identity>,
    /// A register/login is suspended on hashing
    pub auth_pending: bool,
    /// Bootstrap reply already sent
    pub joined: bool,
}

impl Session {
    /// Create an anonymous session with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            sender,
            identity: None,
            auth_pending: false,
            joined: false,
        }
    }

    /// Queue a message for this client without waiting
    ///
    /// A full queue means the client is not reading; the message is refused
    /// rather than stalling the caller.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Bind an identity to this session
    ///
    /// Returns false, leaving the session untouched, if one is already bound.
    pub fn bind(&mut self, identity: Identity) -> bool {
        if self.identity.is_some() {
            return false;
        }
        self.identity = Some(identity);
        true
    }
}

/// All live sessions, keyed by connection
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ClientId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        self.sessions.insert(id, Session::new(id, sender));
    }

    /// Remove a session, returning it if it was live
    pub fn disconnect(&mut self, id: ClientId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Queue for one connection; a vanished connection is ignored
    pub fn send_to(&self, id: ClientId, msg: ServerMessage) {
        if let Some(session) = self.sessions.get(&id) {
            deliver(session, msg);
        }
    }

    /// Queue for every connection except `exclude`
    pub fn broadcast(&self, msg: ServerMessage, exclude: Option<ClientId>) {
        for session in self.sessions.values() {
            if Some(session.id) != exclude {
                deliver(session, msg.clone());
            }
        }
    }
}

/// Queue one message, logging anything that could not be delivered
fn deliver(session: &Session, msg: ServerMessage) {
    match session.send(msg) {
        Ok(()) => {}
        Err(SendError::QueueFull) => {
            warn!("Client {} is not reading, dropped message", session.id);
        }
        Err(SendError::ChannelClosed) => {
            debug!("Dropped message for closed client {}", session.id);
        }
    }
}
