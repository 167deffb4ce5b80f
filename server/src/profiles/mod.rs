//! REST endpoints for profile CRUD and username search.
//! Thin wrappers over the store; no realtime involvement.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::db::models::{Profile, ProfileSummary};
use crate::db::store::ProfileUpsert;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileRequest {
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub birthday: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub hobbies: Vec<String>,
    pub question_time: Option<String>,
}

/// POST /api/profile — Create or update a profile.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Json(body): Json<UpsertProfileRequest>,
) -> Result<Json<Profile>, StatusCode> {
    let profile = state
        .store
        .upsert_profile(ProfileUpsert {
            id: body.user_id,
            username: body.username,
            email: body.email,
            age: body.age,
            birthday: body.birthday,
            bio: body.bio,
            profile_picture: body.profile_picture,
            interests: body.interests,
            hobbies: body.hobbies,
            question_time: body.question_time,
        })
        .await
        .map_err(internal_error)?;
    Ok(Json(profile))
}

/// GET /api/profile/{user_id} — Fetch a profile; null when absent.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Option<Profile>>, StatusCode> {
    let profile = state
        .store
        .get_profile(&user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: Option<String>,
    pub current_user_id: Option<String>,
}

/// GET /api/users/search?q=&currentUserId= — Username substring search,
/// excluding the caller. An empty query returns an empty list.
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ProfileSummary>>, StatusCode> {
    let Some(q) = query.q.filter(|q| !q.is_empty()) else {
        return Ok(Json(Vec::new()));
    };
    let exclude = query.current_user_id.unwrap_or_default();
    let results = state
        .store
        .search_profiles(&q, &exclude)
        .await
        .map_err(internal_error)?;
    Ok(Json(results))
}

fn internal_error(err: crate::db::store::StoreError) -> StatusCode {
    tracing::error!(error = %err, "profile operation failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
