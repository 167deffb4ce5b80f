use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: Profiles and friendships

CREATE TABLE profiles (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    email TEXT,
    age INTEGER,
    birthday TEXT,
    bio TEXT,
    profile_picture TEXT,
    interests TEXT NOT NULL DEFAULT '[]',
    hobbies TEXT NOT NULL DEFAULT '[]',
    question_time TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX idx_profiles_username ON profiles(username);

CREATE TABLE friendships (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    friend_id TEXT NOT NULL,
    relationship_type TEXT NOT NULL DEFAULT 'Friends',
    status TEXT NOT NULL DEFAULT 'accepted',
    created_at TEXT NOT NULL
);

CREATE INDEX idx_friendships_user ON friendships(user_id);
CREATE INDEX idx_friendships_friend ON friendships(friend_id);
",
        ),
        M::up(
            "-- Migration 2: Chat messages

CREATE TABLE messages (
    id TEXT PRIMARY KEY,
    sender_id TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX idx_messages_sender ON messages(sender_id, receiver_id, created_at);
CREATE INDEX idx_messages_receiver ON messages(receiver_id, sender_id, created_at);
",
        ),
        M::up(
            "-- Migration 3: Daily question answers

-- One row per submission. Re-answering the same question on the same day
-- inserts another row; uniqueness is deliberately not enforced here.
CREATE TABLE daily_answers (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    friend_id TEXT NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    answered_at TEXT NOT NULL
);

CREATE INDEX idx_daily_answers_lookup ON daily_answers(user_id, friend_id, question, answered_at);
",
        ),
    ])
}
