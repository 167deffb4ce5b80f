//! The realtime event contract and gateway dispatch.
//!
//! Frames are JSON text messages of the shape {"event": <name>, "data":
//! <payload>}. Inbound and outbound contracts are closed enums so dispatch
//! is exhaustive — adding an event without handling it is a compile error.
//!
//! Dispatch owns the per-connection state machine: a connection starts
//! Unregistered and becomes Registered on the first `register` event.
//! Room-scoped events arriving before that are silent no-ops; the gateway
//! never assumes a user identity exists.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::db::models::{ChatMessage, Friendship};
use crate::db::store::StoreError;
use crate::state::AppState;
use crate::ws::registry::{ConnectionId, ConnectionSender};

/// Notification previews are truncated to this many characters.
const PREVIEW_CHARS: usize = 50;

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to a user identity; flips presence on.
    Register(String),
    /// Join the pair room shared with a friend.
    #[serde(rename_all = "camelCase")]
    JoinChat { user_id: String, friend_id: String },
    /// Persist a message, then fan out to the pair room and the receiver's
    /// personal channel.
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        sender_id: String,
        receiver_id: String,
        text: String,
    },
    /// Relay a typing indicator to the rest of the pair room.
    #[serde(rename_all = "camelCase")]
    Typing {
        user_id: String,
        friend_id: String,
        is_typing: bool,
    },
    /// Ask whether a user is currently online; answered to the caller only.
    CheckOnline(String),
}

/// Events the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Stored chat message, delivered to everyone in the pair room.
    NewMessage(ChatMessage),
    /// Lightweight ping on the receiver's personal channel, for when they
    /// are connected but not in the chat room.
    #[serde(rename_all = "camelCase")]
    MessageNotification { from: String, preview: String },
    #[serde(rename_all = "camelCase")]
    UserTyping { user_id: String, is_typing: bool },
    /// Presence flip, broadcast to every connected client.
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: String, is_online: bool },
    /// Reply to check_online, delivered to the caller only.
    #[serde(rename_all = "camelCase")]
    OnlineStatus { user_id: String, is_online: bool },
    /// Both sides of a friendship answered today's question. Each
    /// participant receives their own mirror of the payload.
    #[serde(rename_all = "camelCase")]
    BothAnswered {
        question: String,
        user_answer: String,
        partner_answer: String,
    },
    /// A friendship was created naming this user as the added party.
    FriendAdded(Friendship),
    /// Handler failure, reported to the originating connection only.
    Error { message: String },
}

impl ServerEvent {
    /// Encode as a websocket text frame. Serialization of these closed
    /// types cannot realistically fail; if it ever does, log and drop.
    pub fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode server event");
                None
            }
        }
    }
}

/// Handle one inbound text frame: decode, then dispatch.
/// Malformed frames are dropped without tearing down the connection or
/// notifying the client — one bad client must not disturb the process.
pub async fn handle_text_frame(
    text: &str,
    conn: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
    identity: &mut Option<String>,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "undecodable client event, dropping");
            return;
        }
    };
    dispatch(event, conn, tx, state, identity).await;
}

/// Exhaustive dispatch over the inbound contract.
async fn dispatch(
    event: ClientEvent,
    conn: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
    identity: &mut Option<String>,
) {
    match event {
        ClientEvent::Register(user_id) => {
            handle_register(user_id, conn, tx, state, identity);
        }
        ClientEvent::JoinChat { user_id, friend_id } => {
            if identity.is_none() {
                tracing::debug!("join_chat before register, ignoring");
                return;
            }
            state.rooms.join(conn, tx.clone(), &user_id, &friend_id);
            tracing::debug!(user_id = %user_id, friend_id = %friend_id, "joined pair room");
        }
        ClientEvent::ChatMessage {
            sender_id,
            receiver_id,
            text,
        } => {
            if identity.is_none() {
                tracing::debug!("chat_message before register, ignoring");
                return;
            }
            if let Err(err) = handle_chat_message(&sender_id, &receiver_id, &text, state).await {
                tracing::warn!(
                    sender_id = %sender_id,
                    error = %err,
                    "chat message failed"
                );
                send_error(tx, "Failed to send message");
            }
        }
        ClientEvent::Typing {
            user_id,
            friend_id,
            is_typing,
        } => {
            if identity.is_none() {
                tracing::debug!("typing before register, ignoring");
                return;
            }
            let event = ServerEvent::UserTyping {
                user_id: user_id.clone(),
                is_typing,
            };
            state.rooms.broadcast_except(&user_id, &friend_id, conn, &event);
        }
        ClientEvent::CheckOnline(user_id) => {
            let is_online = state.registry.is_online(&user_id);
            send_event(tx, &ServerEvent::OnlineStatus { user_id, is_online });
        }
    }
}

/// Bind the connection to a user identity and broadcast any presence flips
/// this caused. Re-registering under a new identity may flip the previous
/// identity offline as well.
fn handle_register(
    user_id: String,
    conn: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
    identity: &mut Option<String>,
) {
    let outcome = state.registry.register(conn, &user_id, tx.clone());

    if let Some(displaced) = outcome.displaced {
        if displaced.went_offline {
            state.registry.broadcast_all(&ServerEvent::UserOnline {
                user_id: displaced.user_id,
                is_online: false,
            });
        }
    }
    if outcome.came_online {
        state.registry.broadcast_all(&ServerEvent::UserOnline {
            user_id: user_id.clone(),
            is_online: true,
        });
    }

    tracing::info!(user_id = %user_id, "connection registered");
    *identity = Some(user_id);
}

/// Persist, then broadcast. Nothing is broadcast when the insert fails, so
/// the receiver never observes a message that was not durably stored.
async fn handle_chat_message(
    sender_id: &str,
    receiver_id: &str,
    text: &str,
    state: &AppState,
) -> Result<(), StoreError> {
    let stored = state.store.insert_message(sender_id, receiver_id, text).await?;

    state
        .rooms
        .broadcast(sender_id, receiver_id, &ServerEvent::NewMessage(stored));

    // The receiver may be online without having the chat open; their
    // personal channel gets a preview regardless of room membership.
    state.registry.send_to_user(
        receiver_id,
        &ServerEvent::MessageNotification {
            from: sender_id.to_string(),
            preview: preview(text),
        },
    );
    Ok(())
}

/// First PREVIEW_CHARS characters of the message body, on a char boundary.
fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn send_event(tx: &ConnectionSender, event: &ServerEvent) {
    if let Some(msg) = event.to_message() {
        let _ = tx.send(msg);
    }
}

fn send_error(tx: &ConnectionSender, message: &str) {
    send_event(
        tx,
        &ServerEvent::Error {
            message: message.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_decode_from_wire_shape() {
        let register: ClientEvent =
            serde_json::from_str(r#"{"event":"register","data":"user-1"}"#).unwrap();
        assert_eq!(register, ClientEvent::Register("user-1".into()));

        let join: ClientEvent = serde_json::from_str(
            r#"{"event":"join_chat","data":{"userId":"user-1","friendId":"user-2"}}"#,
        )
        .unwrap();
        assert_eq!(
            join,
            ClientEvent::JoinChat {
                user_id: "user-1".into(),
                friend_id: "user-2".into()
            }
        );

        let typing: ClientEvent = serde_json::from_str(
            r#"{"event":"typing","data":{"userId":"user-1","friendId":"user-2","isTyping":true}}"#,
        )
        .unwrap();
        assert_eq!(
            typing,
            ClientEvent::Typing {
                user_id: "user-1".into(),
                friend_id: "user-2".into(),
                is_typing: true
            }
        );
    }

    #[test]
    fn server_events_encode_to_wire_shape() {
        let json = serde_json::to_value(ServerEvent::UserOnline {
            user_id: "user-1".into(),
            is_online: true,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "user_online",
                "data": {"userId": "user-1", "isOnline": true}
            })
        );

        let json = serde_json::to_value(ServerEvent::BothAnswered {
            question: "q".into(),
            user_answer: "a".into(),
            partner_answer: "b".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "both_answered",
                "data": {"question": "q", "userAnswer": "a", "partnerAnswer": "b"}
            })
        );
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(80);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
        // Multi-byte characters must not be split.
        let emoji = "🎈".repeat(60);
        assert_eq!(preview(&emoji).chars().count(), PREVIEW_CHARS);
    }
}
