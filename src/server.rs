//! ChatServer Actor implementation
//!
//! The central actor that owns all shared state: sessions, channel history,
//! presence, typing indicators and the user directory. Commands are handled
//! one at a time, so no locks are needed.
//!
//! Password hashing and comparison are the only operations that leave the
//! actor. They run on the blocking pool and come back as an `AuthOutcome`,
//! letting other connections' commands be processed in between.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::directory::{compare_secret, hash_secret, UserDirectory};
use crate::error::AppError;
use crate::history::ChannelHistoryStore;
use crate::message::{ChatMessage, ServerMessage};
use crate::presence::PresenceTracker;
use crate::session::{Session, SessionRegistry};
use crate::typing::TypingIndicatorTracker;
use crate::types::{ClientId, Identity, Rank};

/// Longest alias accepted at registration
const MAX_ALIAS_LEN: usize = 32;

/// Longest channel name accepted in any event
const MAX_CHANNEL_LEN: usize = 64;

/// Longest chat body, in characters
const MAX_BODY_LEN: usize = 4000;

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client disconnected
    Disconnect { client_id: ClientId },
    /// Create an identity and authenticate as it
    Register {
        client_id: ClientId,
        alias: String,
        password: String,
        invite_code: String,
    },
    /// Authenticate as an existing identity
    Login {
        client_id: ClientId,
        alias: String,
        password: String,
    },
    /// Post-auth bootstrap
    Joined { client_id: ClientId },
    /// Request a channel's history
    SwitchChannel { client_id: ClientId, channel: String },
    /// Post a message to a channel
    ChatMessage {
        client_id: ClientId,
        channel: String,
        body: String,
    },
    /// Client started typing in a channel
    TypingStart { client_id: ClientId, channel: String },
    /// Client stopped typing
    TypingStop { client_id: ClientId },
}

/// Result of a suspended register/login, delivered back to the actor
#[derive(Debug)]
enum AuthOutcome {
    Registered {
        client_id: ClientId,
        alias: String,
        hash: Result<String, AppError>,
    },
    LoggedIn {
        client_id: ClientId,
        identity: Identity,
        verified: bool,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All live connections
    sessions: SessionRegistry,
    /// Bounded per-channel history
    history: ChannelHistoryStore,
    /// Online identities
    presence: PresenceTracker,
    /// Per-connection typing state
    typing: TypingIndicatorTracker,
    /// Registered identities
    directory: UserDirectory,
    /// Aliases reserved by registrations still hashing
    pending_aliases: HashSet<String>,
    invite_code: String,
    admin_alias: String,
    default_channel: String,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
    outcome_tx: mpsc::UnboundedSender<AuthOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<AuthOutcome>,
}

impl ChatServer {
    /// Create a new ChatServer
    ///
    /// Seeds the administrator identity if the directory is empty.
    pub fn new(
        config: &Config,
        mut directory: UserDirectory,
        receiver: mpsc::Receiver<ServerCommand>,
    ) -> Self {
        directory.bootstrap(&config.admin_alias);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            sessions: SessionRegistry::new(),
            history: ChannelHistoryStore::with_limits(config.max_history, config.max_channels),
            presence: PresenceTracker::new(),
            typing: TypingIndicatorTracker::new(),
            directory,
            pending_aliases: HashSet::new(),
            invite_code: config.invite_code.clone(),
            admin_alias: config.admin_alias.clone(),
            default_channel: config.default_channel.clone(),
            receiver,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(outcome) = self.outcome_rx.recv() => {
                    self.handle_outcome(outcome);
                }
            }
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Register {
                client_id,
                alias,
                password,
                invite_code,
            } => {
                self.handle_register(client_id, alias, password, invite_code);
            }
            ServerCommand::Login {
                client_id,
                alias,
                password,
            } => {
                self.handle_login(client_id, alias, password);
            }
            ServerCommand::Joined { client_id } => {
                self.handle_joined(client_id);
            }
            ServerCommand::SwitchChannel { client_id, channel } => {
                self.handle_switch_channel(client_id, channel);
            }
            ServerCommand::ChatMessage {
                client_id,
                channel,
                body,
            } => {
                self.handle_chat(client_id, channel, body);
            }
            ServerCommand::TypingStart { client_id, channel } => {
                self.handle_typing_start(client_id, channel);
            }
            ServerCommand::TypingStop { client_id } => {
                self.handle_typing_stop(client_id);
            }
        }
    }

    /// Resume a register/login after its hashing step
    fn handle_outcome(&mut self, outcome: AuthOutcome) {
        match outcome {
            AuthOutcome::Registered {
                client_id,
                alias,
                hash,
            } => {
                self.complete_register(client_id, alias, hash);
            }
            AuthOutcome::LoggedIn {
                client_id,
                identity,
                verified,
            } => {
                self.complete_login(client_id, identity, verified);
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        self.sessions.connect(client_id, sender);
        debug!("Total clients: {}", self.sessions.len());
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        let Some(session) = self.sessions.disconnect(client_id) else {
            return;
        };
        info!("Client {} disconnected", client_id);

        if let Some(identity) = session.identity() {
            self.presence.mark_offline(&identity.alias);
            self.broadcast_presence();
        }

        if self.typing.clear_typing(client_id) {
            self.broadcast_typing(client_id);
        }

        debug!(
            "Total clients: {}, online: {}",
            self.sessions.len(),
            self.presence.online_count()
        );
    }

    /// Handle registration: validate synchronously, then hash off-actor
    fn handle_register(
        &mut self,
        client_id: ClientId,
        alias: String,
        password: String,
        invite_code: String,
    ) {
        let Some(session) = self.sessions.get(client_id) else {
            return;
        };
        let alias = alias.trim().to_string();
        if let Err(e) = self.check_register(session, &alias, &password, &invite_code) {
            debug!("Client {} registration rejected: {}", client_id, e);
            self.sessions.send_to(client_id, ServerMessage::register_error(&e));
            return;
        }

        // Reserve before suspending so a concurrent registration sees it
        self.pending_aliases.insert(alias.clone());
        if let Some(session) = self.sessions.get_mut(client_id) {
            session.auth_pending = true;
        }

        let tx = self.outcome_tx.clone();
        tokio::task::spawn_blocking(move || {
            let hash = hash_secret(&password);
            let _ = tx.send(AuthOutcome::Registered {
                client_id,
                alias,
                hash,
            });
        });
    }

    fn check_register(
        &self,
        session: &Session,
        alias: &str,
        password: &str,
        invite_code: &str,
    ) -> Result<(), AppError> {
        if session.is_authenticated() {
            return Err(AppError::AlreadyAuthenticated);
        }
        if session.auth_pending {
            return Err(AppError::AuthInProgress);
        }
        if invite_code != self.invite_code {
            return Err(AppError::InvalidInvite);
        }
        if alias.is_empty() || alias.chars().count() > MAX_ALIAS_LEN {
            return Err(AppError::InvalidRegistration(format!(
                "alias must be 1 to {} characters",
                MAX_ALIAS_LEN
            )));
        }
        if password.is_empty() {
            return Err(AppError::InvalidRegistration("password must not be empty".to_string()));
        }
        if self.directory.exists(alias) || self.pending_aliases.contains(alias) {
            return Err(AppError::NameTaken);
        }
        Ok(())
    }

    fn complete_register(
        &mut self,
        client_id: ClientId,
        alias: String,
        hash: Result<String, AppError>,
    ) {
        self.pending_aliases.remove(&alias);

        let hash = match hash {
            Ok(hash) => hash,
            Err(e) => {
                error!("Registration of '{}' failed: {}", alias, e);
                if let Some(session) = self.sessions.get_mut(client_id) {
                    session.auth_pending = false;
                }
                self.sessions.send_to(client_id, ServerMessage::register_error(&e));
                return;
            }
        };

        let rank = Rank::default();
        self.directory.insert(alias.clone(), Some(hash), rank);
        self.directory.persist();
        info!("Registered identity '{}'", alias);

        self.bind_session(client_id, Identity::new(alias, rank), true);
    }

    /// Handle login: look up synchronously, compare off-actor
    fn handle_login(&mut self, client_id: ClientId, alias: String, password: String) {
        let Some(session) = self.sessions.get(client_id) else {
            return;
        };

        let rejection = if session.is_authenticated() {
            Some(AppError::AlreadyAuthenticated)
        } else if session.auth_pending {
            Some(AppError::AuthInProgress)
        } else {
            None
        };
        if let Some(e) = rejection {
            self.sessions.send_to(client_id, ServerMessage::login_error(&e));
            return;
        }

        let alias = alias.trim().to_string();
        let Some((hash, rank)) = self
            .directory
            .get(&alias)
            .and_then(|record| Some((record.password_hash.clone()?, record.rank)))
        else {
            debug!("Client {} login as unknown or passwordless '{}'", client_id, alias);
            self.sessions.send_to(
                client_id,
                ServerMessage::login_error(&AppError::InvalidCredentials),
            );
            return;
        };

        if let Some(session) = self.sessions.get_mut(client_id) {
            session.auth_pending = true;
        }

        let identity = Identity::new(alias, rank);
        let tx = self.outcome_tx.clone();
        tokio::task::spawn_blocking(move || {
            let verified = compare_secret(&password, &hash);
            let _ = tx.send(AuthOutcome::LoggedIn {
                client_id,
                identity,
                verified,
            });
        });
    }

    fn complete_login(&mut self, client_id: ClientId, identity: Identity, verified: bool) {
        if !verified {
            let Some(session) = self.sessions.get_mut(client_id) else {
                return;
            };
            session.auth_pending = false;
            warn!("Client {} failed login as '{}'", client_id, identity.alias);
            self.sessions.send_to(
                client_id,
                ServerMessage::login_error(&AppError::InvalidCredentials),
            );
            return;
        }

        info!("Client {} logged in as '{}'", client_id, identity.alias);
        self.bind_session(client_id, identity, false);
    }

    /// Bind an identity to a still-live session, mark it online and announce it
    fn bind_session(&mut self, client_id: ClientId, identity: Identity, registered: bool) {
        let Some(session) = self.sessions.get_mut(client_id) else {
            debug!(
                "Client {} gone before '{}' could be bound",
                client_id, identity.alias
            );
            return;
        };
        session.auth_pending = false;
        if !session.bind(identity.clone()) {
            return;
        }

        let reply = if registered {
            ServerMessage::RegisterSuccess {
                alias: identity.alias.clone(),
                rank: identity.rank,
            }
        } else {
            ServerMessage::LoginSuccess {
                alias: identity.alias.clone(),
                rank: identity.rank,
            }
        };
        self.sessions.send_to(client_id, reply);

        self.presence.mark_online(&identity);
        self.broadcast_presence();
    }

    /// Handle the post-auth bootstrap request
    fn handle_joined(&mut self, client_id: ClientId) {
        let Some(session) = self.sessions.get_mut(client_id) else {
            return;
        };
        if !session.is_authenticated() || session.joined {
            debug!("Ignoring join from client {}", client_id);
            return;
        }
        session.joined = true;

        let update = self.presence.snapshot(&self.directory, &self.admin_alias);
        self.sessions.send_to(client_id, ServerMessage::SystemUpdate(update));
        self.send_history(client_id, self.default_channel.clone());
    }

    /// Handle a channel switch
    fn handle_switch_channel(&mut self, client_id: ClientId, channel: String) {
        if self.identity_of(client_id).is_none() {
            debug!("Ignoring channel switch from unauthenticated client {}", client_id);
            return;
        }
        if !valid_channel(&channel) {
            warn!("Ignoring switch to invalid channel from client {}", client_id);
            return;
        }
        self.send_history(client_id, channel);
    }

    /// Handle chat message
    fn handle_chat(&mut self, client_id: ClientId, channel: String, body: String) {
        let Some(identity) = self.identity_of(client_id) else {
            debug!("Ignoring chat from unauthenticated client {}", client_id);
            return;
        };
        if body.trim().is_empty() {
            return;
        }
        if !valid_channel(&channel) || body.chars().count() > MAX_BODY_LEN {
            warn!("Dropping oversized or malformed chat from client {}", client_id);
            return;
        }

        let message = ChatMessage::stamped(channel, identity.alias, identity.rank, body);
        if !self.history.append(&message.channel, message.clone()) {
            warn!(
                "Dropping chat from client {}: channel limit reached",
                client_id
            );
            return;
        }

        // Sender renders its own copy locally
        self.sessions.broadcast(ServerMessage::ChatMessage(message), Some(client_id));
    }

    /// Handle typing indicator start
    fn handle_typing_start(&mut self, client_id: ClientId, channel: String) {
        let Some(identity) = self.identity_of(client_id) else {
            debug!("Ignoring typing from unauthenticated client {}", client_id);
            return;
        };
        if !valid_channel(&channel) {
            warn!("Ignoring typing in invalid channel from client {}", client_id);
            return;
        }

        self.typing.set_typing(client_id, identity.alias, channel);
        self.broadcast_typing(client_id);
    }

    /// Handle typing indicator stop
    fn handle_typing_stop(&mut self, client_id: ClientId) {
        if self.typing.clear_typing(client_id) {
            self.broadcast_typing(client_id);
        }
    }

    /// Helper: clone the identity bound to a connection
    fn identity_of(&self, client_id: ClientId) -> Option<Identity> {
        self.sessions
            .get(client_id)
            .and_then(|session| session.identity().cloned())
    }

    /// Helper: reply with one channel's history
    fn send_history(&self, client_id: ClientId, channel: String) {
        let history = self.history.get(&channel);
        self.sessions.send_to(client_id, ServerMessage::ChannelHistory { channel, history });
    }

    /// Helper: full roster to every connection
    fn broadcast_presence(&self) {
        let update = self.presence.snapshot(&self.directory, &self.admin_alias);
        self.sessions.broadcast(ServerMessage::SystemUpdate(update), None);
    }

    /// Helper: typing map to every connection but the one that changed it
    fn broadcast_typing(&self, origin: ClientId) {
        let typing = self.typing.snapshot();
        self.sessions.broadcast(ServerMessage::TypingBroadcast { typing }, Some(origin));
    }
}

/// Channel names are non-empty and short
fn valid_channel(channel: &str) -> bool {
    !channel.is_empty() && channel.chars().count() <= MAX_CHANNEL_LEN
}
