//! REST endpoints for friendship bookkeeping.
//!
//! Requests are auto-accepted: a successful request immediately creates an
//! accepted friendship and pushes a friend_added event to the added party's
//! personal channel.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::db::models::{FriendEntry, Friendship};
use crate::state::AppState;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub from_user_id: String,
    pub to_user_id: String,
    pub relationship_type: Option<String>,
}

/// POST /api/friends/request — Create a friendship.
/// Rejected with 400 when a friendship already exists in either direction.
pub async fn request_friend(
    State(state): State<AppState>,
    Json(body): Json<FriendRequest>,
) -> Result<Json<Friendship>, StatusCode> {
    let exists = state
        .store
        .friendship_exists(&body.from_user_id, &body.to_user_id)
        .await
        .map_err(internal_error)?;
    if exists {
        return Err(StatusCode::BAD_REQUEST);
    }

    let relationship_type = body.relationship_type.as_deref().unwrap_or("Friends");
    let record = state
        .store
        .insert_friendship(&body.from_user_id, &body.to_user_id, relationship_type)
        .await
        .map_err(internal_error)?;

    // Notify the added party on their personal channel.
    state
        .registry
        .send_to_user(&body.to_user_id, &ServerEvent::FriendAdded(record.clone()));

    Ok(Json(record))
}

/// GET /api/friends/{id} — Accepted friendships for a user, merged with the
/// friends' profiles.
pub async fn list_friends(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<FriendEntry>>, StatusCode> {
    let friends = state
        .store
        .list_friends(&user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(friends))
}

/// DELETE /api/friends/{id} — Remove a friendship by its id.
pub async fn remove_friend(
    State(state): State<AppState>,
    Path(friendship_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let removed = state
        .store
        .delete_friendship(&friendship_id)
        .await
        .map_err(internal_error)?;
    if removed {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

fn internal_error(err: crate::db::store::StoreError) -> StatusCode {
    tracing::error!(error = %err, "friendship operation failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
