//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake,
//! message parsing, and bidirectional communication with the ChatServer.
//! Frames that do not parse into a `ClientMessage` stop here.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Handle a new TCP connection
///
/// Performs WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle. `buffer` bounds the outbound queue
/// and `max_frame_bytes` the size of any inbound message.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    buffer: usize,
    max_frame_bytes: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(max_frame_bytes);
    ws_config.max_frame_size = Some(max_frame_bytes);
    let ws_stream = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Generate client ID
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer);

    // Register with ChatServer
    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    // Announce the connection ID before anything else is queued
    let connected = serde_json::to_string(&ServerMessage::Connected {
        client_id: client_id.to_string(),
    })?;
    ws_sender.send(Message::Text(connected.into())).await?;

    // Inbound: WebSocket frames -> ServerCommand, in arrival order
    let cmd_tx_read = cmd_tx.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                // Pings are answered by tungstenite; binary frames are not part of the protocol
                Ok(_) => continue,
                Err(e) => {
                    error!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            };

            let Some(cmd) = parse_frame(client_id, &text) else {
                continue;
            };
            if cmd_tx_read.send(cmd).await.is_err() {
                debug!("Server closed, ending read task for {}", client_id);
                break;
            }
        }
    });

    // Outbound: ServerMessage -> WebSocket frames
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message for {}: {}", client_id, e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed for {}", client_id);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Either half ending ends the connection
    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    // Always tell the server, even if the socket died mid-authentication
    let _ = cmd_tx
        .send(ServerCommand::Disconnect { client_id })
        .await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Parse one text frame into a command
///
/// Malformed frames are logged and dropped. The frame text is never logged
/// since it may carry a password.
fn parse_frame(client_id: ClientId, text: &str) -> Option<ServerCommand> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => Some(client_message_to_command(client_id, msg)),
        Err(e) => {
            warn!("Dropping malformed frame from {}: {}", client_id, e);
            None
        }
    }
}

/// Convert a ClientMessage to a ServerCommand
fn client_message_to_command(client_id: ClientId, msg: ClientMessage) -> ServerCommand {
    match msg {
        ClientMessage::Register {
            alias,
            password,
            invite_code,
        } => ServerCommand::Register {
            client_id,
            alias,
            password,
            invite_code,
        },
        ClientMessage::Login { alias, password } => ServerCommand::Login {
            client_id,
            alias,
            password,
        },
        ClientMessage::Joined => ServerCommand::Joined { client_id },
        ClientMessage::SwitchChannel { channel } => {
            ServerCommand::SwitchChannel { client_id, channel }
        }
        ClientMessage::ChatMessage { channel, body } => ServerCommand::ChatMessage {
            client_id,
            channel,
            body,
        },
        ClientMessage::TypingStart { channel } => ServerCommand::TypingStart { client_id, channel },
        ClientMessage::TypingStop => ServerCommand::TypingStop { client_id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_command() {
        let client_id = ClientId::new();
        let json = r#"{"type": "typing_start", "channel": "operations"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        match client_message_to_command(client_id, msg) {
            ServerCommand::TypingStart {
                client_id: id,
                channel,
            } => {
                assert_eq!(id, client_id);
                assert_eq!(channel, "operations");
            }
            other => panic!("Wrong command: {:?}", other),
        }
    }

    #[test]
    fn test_login_frame_to_command() {
        let client_id = ClientId::new();
        let json = r#"{"type": "login", "alias": "Trinity", "password": "pw"}"#;

        assert!(matches!(
            parse_frame(client_id, json),
            Some(ServerCommand::Login { alias, .. }) if alias == "Trinity"
        ));
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let client_id = ClientId::new();
        assert!(parse_frame(client_id, "not json").is_none());
        assert!(parse_frame(client_id, r#"{"type": "switch_channel"}"#).is_none());
        assert!(parse_frame(client_id, r#"{"type": "joined"}"#).is_some());
    }
}
