//! REST endpoints for daily-question answers.
//!
//! Submission drives the matcher; on a match the handler emits the
//! both_answered unlock to each participant's personal channel, mirrored so
//! each side sees its own answer as userAnswer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::answers::matcher;
use crate::db::models::DailyAnswer;
use crate::state::AppState;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub user_id: String,
    pub friend_id: String,
    pub question: String,
    pub answer: String,
}

/// POST /api/answers — Submit a daily answer.
/// Returns the stored row. When the friend already answered the same
/// question today, both participants are notified over their personal
/// channels; a failed submission reports only to the submitter (500).
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(body): Json<SubmitAnswerRequest>,
) -> Result<Json<DailyAnswer>, StatusCode> {
    let (submitted, matched) = matcher::submit_and_check(
        &state.store,
        &body.user_id,
        &body.friend_id,
        &body.question,
        &body.answer,
    )
    .await
    .map_err(|err| {
        tracing::error!(user_id = %body.user_id, error = %err, "answer submission failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if let Some(matched) = matched {
        tracing::info!(
            user_id = %body.user_id,
            friend_id = %body.friend_id,
            "both sides answered today's question"
        );
        // Two mirrored deliveries, not one shared payload.
        state.registry.send_to_user(
            &body.user_id,
            &ServerEvent::BothAnswered {
                question: matched.question.clone(),
                user_answer: matched.user_answer.clone(),
                partner_answer: matched.partner_answer.clone(),
            },
        );
        state.registry.send_to_user(
            &body.friend_id,
            &ServerEvent::BothAnswered {
                question: matched.question,
                user_answer: matched.partner_answer,
                partner_answer: matched.user_answer,
            },
        );
    }

    Ok(Json(submitted))
}

/// GET /api/answers/{user_id}/{friend_id} — Today's answers between two
/// users, oldest first.
pub async fn get_today_answers(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> Result<Json<Vec<DailyAnswer>>, StatusCode> {
    let since = matcher::start_of_today();
    let answers = state
        .store
        .find_answers_between(&user_id, &friend_id, since)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "answers fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(answers))
}
