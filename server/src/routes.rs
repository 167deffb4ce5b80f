use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::db::now_rfc3339;
use crate::state::AppState;
use crate::ws::handler as ws_handler;
use crate::{answers, chat, friends, profiles};

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let profile_routes = Router::new()
        .route("/api/profile", post(profiles::upsert_profile))
        .route("/api/profile/{user_id}", get(profiles::get_profile))
        .route("/api/users/search", get(profiles::search_users));

    // GET takes a user id, DELETE a friendship id; axum needs one parameter
    // name per path shape.
    let friend_routes = Router::new()
        .route("/api/friends/request", post(friends::request_friend))
        .route(
            "/api/friends/{id}",
            get(friends::list_friends).delete(friends::remove_friend),
        );

    let message_routes = Router::new().route(
        "/api/messages/{user_id}/{friend_id}",
        get(chat::messages::get_messages),
    );

    let answer_routes = Router::new()
        .route("/api/answers", post(answers::routes::submit_answer))
        .route(
            "/api/answers/{user_id}/{friend_id}",
            get(answers::routes::get_today_answers),
        );

    // WebSocket endpoint — identity binds via the register event
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/api/health", get(health_check));

    Router::new()
        .merge(profile_routes)
        .merge(friend_routes)
        .merge(message_routes)
        .merge(answer_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// CORS for the web client's dev origins. Explicit method and header lists;
/// origins that fail to parse are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Basic health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": now_rfc3339(),
    }))
}
