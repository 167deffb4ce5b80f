//! Integration tests for the REST wrappers: health, profiles, search,
//! friends listing, and message history.

use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Helper: start the server on a random port and return (base_url, addr).
async fn start_test_server() -> (String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = bond_server::db::init_db(&data_dir).expect("Failed to init DB");
    let state = bond_server::state::AppState::new(db);
    let app = bond_server::routes::build_router(state, &["http://localhost:8080".to_string()]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
        let _keep = tmp_dir;
    });

    let base_url = format!("http://{}", addr);
    (base_url, addr)
}

async fn upsert_profile(client: &reqwest::Client, base_url: &str, user_id: &str, username: &str) {
    let resp = client
        .post(format!("{base_url}/api/profile"))
        .json(&json!({
            "userId": user_id,
            "username": username,
            "bio": "hello",
            "interests": ["reading"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base_url, _addr) = start_test_server().await;

    let body: Value = reqwest::get(format!("{base_url}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_profile_upsert_and_fetch() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    // Missing profile reads as null, not an error.
    let missing: Value = client
        .get(format!("{base_url}/api/profile/user-a"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(missing.is_null());

    upsert_profile(&client, &base_url, "user-a", "alice").await;

    let profile: Value = client
        .get(format!("{base_url}/api/profile/user-a"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["bio"], "hello");
    assert_eq!(profile["interests"], json!(["reading"]));
    let created_at = profile["createdAt"].clone();

    // Updating keeps the id and creation time, changes the rest.
    let resp = client
        .post(format!("{base_url}/api/profile"))
        .json(&json!({"userId": "user-a", "username": "alice-renamed"}))
        .send()
        .await
        .unwrap();
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["username"], "alice-renamed");
    assert_eq!(updated["createdAt"], created_at);
}

#[tokio::test]
async fn test_username_search_excludes_caller() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    upsert_profile(&client, &base_url, "user-a", "starling").await;
    upsert_profile(&client, &base_url, "user-b", "star-gazer").await;
    upsert_profile(&client, &base_url, "user-c", "moonwatcher").await;

    let results: Vec<Value> = client
        .get(format!("{base_url}/api/users/search?q=star&currentUserId=user-a"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "user-b");

    // No query means no results.
    let results: Vec<Value> = client
        .get(format!("{base_url}/api/users/search"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_friends_listing_merges_profiles() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    upsert_profile(&client, &base_url, "user-a", "alice").await;
    upsert_profile(&client, &base_url, "user-b", "bob").await;

    let record: Value = client
        .post(format!("{base_url}/api/friends/request"))
        .json(&json!({"fromUserId": "user-a", "toUserId": "user-b", "relationshipType": "Best Friends"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Both sides see the friendship, each resolving the other's profile.
    let friends_of_a: Vec<Value> = client
        .get(format!("{base_url}/api/friends/user-a"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(friends_of_a.len(), 1);
    assert_eq!(friends_of_a[0]["id"], "user-b");
    assert_eq!(friends_of_a[0]["username"], "bob");
    assert_eq!(friends_of_a[0]["relationshipType"], "Best Friends");

    let friends_of_b: Vec<Value> = client
        .get(format!("{base_url}/api/friends/user-b"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(friends_of_b.len(), 1);
    assert_eq!(friends_of_b[0]["id"], "user-a");

    // Removing by friendship id empties both listings.
    let resp = client
        .delete(format!("{base_url}/api/friends/{}", record["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let friends_of_a: Vec<Value> = client
        .get(format!("{base_url}/api/friends/user-a"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(friends_of_a.is_empty());

    // Deleting again is a 404.
    let resp = client
        .delete(format!("{base_url}/api/friends/{}", record["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_message_history_empty_for_unknown_pair() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let empty: Vec<Value> = client
        .get(format!("{base_url}/api/messages/user-a/user-b"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(empty.is_empty());
}
