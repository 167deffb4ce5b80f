//! REST endpoint for chat history between two users.
//!
//! Sending happens over the websocket (chat_message event); this is the
//! read side a client loads when opening a conversation. Full history,
//! oldest first — pagination is deliberately out of scope.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::db::models::ChatMessage;
use crate::state::AppState;

/// GET /api/messages/{user_id}/{friend_id}
pub async fn get_messages(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> Result<Json<Vec<ChatMessage>>, StatusCode> {
    let messages = state
        .store
        .find_messages_between(&user_id, &friend_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "message history fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(messages))
}
