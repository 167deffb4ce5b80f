//! Database row types for all tables.
//! These correspond 1:1 to the SQLite schema defined in migrations.rs.
//! All of them serialize camelCase because they are re-broadcast verbatim
//! over the wire (REST responses and websocket event payloads).

use serde::{Deserialize, Serialize};

/// User profile record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub birthday: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub interests: Vec<String>,
    pub hobbies: Vec<String>,
    /// Preferred hour for the daily question prompt, "HH:MM"
    pub question_time: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Trimmed profile used by username search results and friend listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// Friendship record. Requests are auto-accepted, so status is
/// 'accepted' for every row written by this server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub relationship_type: String,
    pub status: String,
    pub created_at: String,
}

/// A friend as returned by the friends listing: the friend's profile
/// summary merged with the friendship row it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendEntry {
    pub id: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub relationship_type: String,
    pub friendship_id: String,
}

/// Stored chat message. The id and createdAt are server-assigned at insert
/// time; clients never supply them. The stored representation is what gets
/// re-broadcast so both stay authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub created_at: String,
}

/// One daily-question answer submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyAnswer {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub question: String,
    pub answer: String,
    pub answered_at: String,
}
