//! Data-access layer over the shared SQLite pool.
//!
//! Every method clones the pool handle and runs the actual rusqlite work on
//! the blocking pool, so async handlers never hold the connection lock across
//! an await point. Callers treat every operation as fallible and decide how
//! to surface a StoreError (HTTP 500 on the REST side, an `error` event on
//! the websocket side).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::answers::AnswerStore;
use crate::db::models::{
    ChatMessage, DailyAnswer, FriendEntry, Friendship, Profile, ProfileSummary,
};
use crate::db::{format_rfc3339, now_rfc3339, DbPool};

/// Maximum rows returned by username search.
const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    PoisonedLock,

    #[error("blocking task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Handle to the persistent store. Cheap to clone; all clones share the
/// same underlying connection.
#[derive(Clone)]
pub struct Store {
    db: DbPool,
}

/// Input for profile upsert. created_at is preserved when the row exists.
#[derive(Debug, Clone)]
pub struct ProfileUpsert {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub birthday: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub interests: Vec<String>,
    pub hobbies: Vec<String>,
    pub question_time: Option<String>,
}

impl Store {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    // --- Profiles ---

    pub async fn upsert_profile(&self, input: ProfileUpsert) -> Result<Profile, StoreError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let now = now_rfc3339();
            let interests = serde_json::to_string(&input.interests).unwrap_or_else(|_| "[]".into());
            let hobbies = serde_json::to_string(&input.hobbies).unwrap_or_else(|_| "[]".into());

            conn.execute(
                "INSERT INTO profiles (id, username, email, age, birthday, bio, profile_picture,
                                       interests, hobbies, question_time, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                     username = ?2, email = ?3, age = ?4, birthday = ?5, bio = ?6,
                     profile_picture = ?7, interests = ?8, hobbies = ?9,
                     question_time = ?10, updated_at = ?11",
                params![
                    input.id,
                    input.username,
                    input.email,
                    input.age,
                    input.birthday,
                    input.bio,
                    input.profile_picture,
                    interests,
                    hobbies,
                    input.question_time,
                    now,
                ],
            )?;

            let profile = conn.query_row(
                "SELECT id, username, email, age, birthday, bio, profile_picture,
                        interests, hobbies, question_time, created_at, updated_at
                 FROM profiles WHERE id = ?1",
                params![input.id],
                profile_from_row,
            )?;
            Ok(profile)
        })
        .await?
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let db = self.db.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let profile = conn
                .query_row(
                    "SELECT id, username, email, age, birthday, bio, profile_picture,
                            interests, hobbies, question_time, created_at, updated_at
                     FROM profiles WHERE id = ?1",
                    params![user_id],
                    profile_from_row,
                )
                .optional()?;
            Ok(profile)
        })
        .await?
    }

    /// Username substring search, excluding the caller.
    /// SQLite LIKE is case-insensitive for ASCII, matching the original
    /// service's ilike behavior.
    pub async fn search_profiles(
        &self,
        query: &str,
        exclude_id: &str,
    ) -> Result<Vec<ProfileSummary>, StoreError> {
        let db = self.db.clone();
        let query = query.to_string();
        let exclude_id = exclude_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let mut stmt = conn.prepare(
                "SELECT id, username, bio, profile_picture FROM profiles
                 WHERE username LIKE '%' || ?1 || '%' AND id != ?2
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![query, exclude_id, SEARCH_LIMIT], |row| {
                    Ok(ProfileSummary {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        bio: row.get(2)?,
                        profile_picture: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    // --- Friendships ---

    /// True if a friendship row exists between the two users in either
    /// direction (pending or accepted).
    pub async fn friendship_exists(&self, user_a: &str, user_b: &str) -> Result<bool, StoreError> {
        let db = self.db.clone();
        let a = user_a.to_string();
        let b = user_b.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friendships
                 WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
                params![a, b],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await?
    }

    pub async fn insert_friendship(
        &self,
        user_id: &str,
        friend_id: &str,
        relationship_type: &str,
    ) -> Result<Friendship, StoreError> {
        let db = self.db.clone();
        let row = Friendship {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            friend_id: friend_id.to_string(),
            relationship_type: relationship_type.to_string(),
            status: "accepted".to_string(),
            created_at: now_rfc3339(),
        };
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            conn.execute(
                "INSERT INTO friendships (id, user_id, friend_id, relationship_type, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.id,
                    row.user_id,
                    row.friend_id,
                    row.relationship_type,
                    row.status,
                    row.created_at,
                ],
            )?;
            Ok(row)
        })
        .await?
    }

    /// Accepted friendships for a user, with the friend's profile merged in.
    pub async fn list_friends(&self, user_id: &str) -> Result<Vec<FriendEntry>, StoreError> {
        let db = self.db.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let mut stmt = conn.prepare(
                "SELECT p.id, p.username, p.bio, p.profile_picture, f.relationship_type, f.id
                 FROM friendships f
                 JOIN profiles p
                   ON p.id = CASE WHEN f.user_id = ?1 THEN f.friend_id ELSE f.user_id END
                 WHERE (f.user_id = ?1 OR f.friend_id = ?1) AND f.status = 'accepted'
                 ORDER BY f.created_at ASC",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(FriendEntry {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        bio: row.get(2)?,
                        profile_picture: row.get(3)?,
                        relationship_type: row.get(4)?,
                        friendship_id: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Returns false when no row matched the id.
    pub async fn delete_friendship(&self, friendship_id: &str) -> Result<bool, StoreError> {
        let db = self.db.clone();
        let friendship_id = friendship_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let affected =
                conn.execute("DELETE FROM friendships WHERE id = ?1", params![friendship_id])?;
            Ok(affected > 0)
        })
        .await?
    }

    // --- Chat messages ---

    /// Persist a chat message. The returned row carries the server-assigned
    /// id and timestamp; this stored representation is what gets broadcast.
    pub async fn insert_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<ChatMessage, StoreError> {
        let db = self.db.clone();
        let row = ChatMessage {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            text: text.to_string(),
            created_at: now_rfc3339(),
        };
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.sender_id, row.receiver_id, row.text, row.created_at],
            )?;
            Ok(row)
        })
        .await?
    }

    /// Full conversation history between two users, oldest first.
    pub async fn find_messages_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let db = self.db.clone();
        let a = user_a.to_string();
        let b = user_b.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, content, created_at FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map(params![a, b], message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    // --- Daily answers ---

    /// Answers exchanged between two users since the given cutoff, oldest
    /// first. Backs the "today's answers" endpoint.
    pub async fn find_answers_between(
        &self,
        user_a: &str,
        user_b: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyAnswer>, StoreError> {
        let db = self.db.clone();
        let a = user_a.to_string();
        let b = user_b.to_string();
        let since = format_rfc3339(since);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let mut stmt = conn.prepare(
                "SELECT id, user_id, friend_id, question, answer, answered_at FROM daily_answers
                 WHERE ((user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1))
                   AND answered_at >= ?3
                 ORDER BY answered_at ASC",
            )?;
            let rows = stmt
                .query_map(params![a, b, since], answer_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }
}

/// The answer-store port consumed by the daily-answer matcher.
#[async_trait]
impl AnswerStore for Store {
    async fn insert_answer(
        &self,
        user_id: &str,
        friend_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<DailyAnswer, StoreError> {
        let db = self.db.clone();
        let row = DailyAnswer {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            friend_id: friend_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            answered_at: now_rfc3339(),
        };
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            conn.execute(
                "INSERT INTO daily_answers (id, user_id, friend_id, question, answer, answered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![row.id, row.user_id, row.friend_id, row.question, row.answer, row.answered_at],
            )?;
            Ok(row)
        })
        .await?
    }

    /// Earliest answer authored by `author_id` about `about_id` for the
    /// identical question text at or after the cutoff. Taking the earliest
    /// row makes the pick deterministic when a user re-answered the same
    /// question that day.
    async fn find_answer(
        &self,
        author_id: &str,
        about_id: &str,
        question: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DailyAnswer>, StoreError> {
        let db = self.db.clone();
        let author = author_id.to_string();
        let about = about_id.to_string();
        let question = question.to_string();
        let since = format_rfc3339(since);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::PoisonedLock)?;
            let row = conn
                .query_row(
                    "SELECT id, user_id, friend_id, question, answer, answered_at
                     FROM daily_answers
                     WHERE user_id = ?1 AND friend_id = ?2 AND question = ?3
                       AND answered_at >= ?4
                     ORDER BY answered_at ASC
                     LIMIT 1",
                    params![author, about, question, since],
                    answer_from_row,
                )
                .optional()?;
            Ok(row)
        })
        .await?
    }
}

// --- Row mapping helpers ---

fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    let interests_json: String = row.get(7)?;
    let hobbies_json: String = row.get(8)?;
    Ok(Profile {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        age: row.get(3)?,
        birthday: row.get(4)?,
        bio: row.get(5)?,
        profile_picture: row.get(6)?,
        interests: serde_json::from_str(&interests_json).unwrap_or_default(),
        hobbies: serde_json::from_str(&hobbies_json).unwrap_or_default(),
        question_time: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn message_from_row(row: &rusqlite::Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn answer_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyAnswer> {
    Ok(DailyAnswer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        friend_id: row.get(2)?,
        question: row.get(3)?,
        answer: row.get(4)?,
        answered_at: row.get(5)?,
    })
}
