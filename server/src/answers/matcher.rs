//! Daily-answer match detection.
//!
//! When a user submits an answer, the matcher persists it and then checks
//! whether the paired friend already answered the identical question today.
//! The store is consumed through the AnswerStore port so the matching logic
//! can be exercised against an in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Local, LocalResult, NaiveTime, TimeZone, Utc};

use crate::db::models::DailyAnswer;
use crate::db::store::StoreError;

/// Data-access port for answer persistence and counterpart lookup.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Durably record one answer submission.
    async fn insert_answer(
        &self,
        user_id: &str,
        friend_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<DailyAnswer, StoreError>;

    /// An answer authored by `author_id` addressed to `about_id` for the
    /// identical question text, at or after the cutoff.
    async fn find_answer(
        &self,
        author_id: &str,
        about_id: &str,
        question: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DailyAnswer>, StoreError>;
}

/// Ephemeral pairing of the two answers, from the submitter's perspective.
/// Never persisted — it exists only to drive the both_answered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub question: String,
    pub user_answer: String,
    pub partner_answer: String,
}

/// Persist an answer, then check for the friend's same-day counterpart.
///
/// Failure semantics: a persist failure fails the whole operation — no
/// lookup runs and no notification should be sent. A lookup failure after a
/// successful persist is tolerated silently: the answer is durably recorded
/// and the friend's later submission re-runs the symmetric check.
pub async fn submit_and_check<S: AnswerStore + ?Sized>(
    store: &S,
    user_id: &str,
    friend_id: &str,
    question: &str,
    answer: &str,
) -> Result<(DailyAnswer, Option<MatchResult>), StoreError> {
    let submitted = store
        .insert_answer(user_id, friend_id, question, answer)
        .await?;

    // One cutoff for the whole call; re-deriving it per lookup could let the
    // day boundary shift between the two sides of the comparison.
    let since = start_of_today();

    match store.find_answer(friend_id, user_id, question, since).await {
        Ok(Some(counterpart)) => {
            let matched = MatchResult {
                question: question.to_string(),
                user_answer: submitted.answer.clone(),
                partner_answer: counterpart.answer,
            };
            Ok((submitted, Some(matched)))
        }
        Ok(None) => Ok((submitted, None)),
        Err(err) => {
            tracing::warn!(
                user_id = %user_id,
                friend_id = %friend_id,
                error = %err,
                "counterpart lookup failed after persist; match deferred to the friend's submission"
            );
            Ok((submitted, None))
        }
    }
}

/// Start of the current calendar day in server-local time, as a UTC instant.
pub(crate) fn start_of_today() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    let midnight = today.and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(Local) {
        LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
            instant.with_timezone(&Utc)
        }
        // Local midnight skipped by a DST jump; read the wall-clock date as UTC.
        LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::format_rfc3339;
    use chrono::Duration;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// In-memory stand-in for the persistent store, with switchable
    /// failure injection for either port method.
    #[derive(Default)]
    struct MemoryAnswerStore {
        answers: Mutex<Vec<DailyAnswer>>,
        fail_insert: bool,
        fail_lookup: bool,
    }

    impl MemoryAnswerStore {
        fn seed(&self, user_id: &str, friend_id: &str, question: &str, answer: &str, at: DateTime<Utc>) {
            self.answers.lock().unwrap().push(DailyAnswer {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                friend_id: friend_id.to_string(),
                question: question.to_string(),
                answer: answer.to_string(),
                answered_at: format_rfc3339(at),
            });
        }
    }

    #[async_trait]
    impl AnswerStore for MemoryAnswerStore {
        async fn insert_answer(
            &self,
            user_id: &str,
            friend_id: &str,
            question: &str,
            answer: &str,
        ) -> Result<DailyAnswer, StoreError> {
            if self.fail_insert {
                return Err(StoreError::PoisonedLock);
            }
            let record = DailyAnswer {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                friend_id: friend_id.to_string(),
                question: question.to_string(),
                answer: answer.to_string(),
                answered_at: format_rfc3339(Utc::now()),
            };
            self.answers.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn find_answer(
            &self,
            author_id: &str,
            about_id: &str,
            question: &str,
            since: DateTime<Utc>,
        ) -> Result<Option<DailyAnswer>, StoreError> {
            if self.fail_lookup {
                return Err(StoreError::PoisonedLock);
            }
            let cutoff = format_rfc3339(since);
            Ok(self
                .answers
                .lock()
                .unwrap()
                .iter()
                .filter(|row| {
                    row.user_id == author_id
                        && row.friend_id == about_id
                        && row.question == question
                        && row.answered_at >= cutoff
                })
                .min_by(|a, b| a.answered_at.cmp(&b.answered_at))
                .cloned())
        }
    }

    const QUESTION: &str = "What made you smile today?";

    #[tokio::test]
    async fn no_counterpart_yields_no_match() {
        let store = MemoryAnswerStore::default();
        let (submitted, matched) = submit_and_check(&store, "a", "b", QUESTION, "sunshine")
            .await
            .unwrap();
        assert_eq!(submitted.answer, "sunshine");
        assert!(matched.is_none());
    }

    #[tokio::test]
    async fn same_day_counterpart_matches_with_mirrored_roles() {
        let store = MemoryAnswerStore::default();
        store.seed("b", "a", QUESTION, "coffee", start_of_today() + Duration::seconds(30));

        let (_, matched) = submit_and_check(&store, "a", "b", QUESTION, "sunshine")
            .await
            .unwrap();
        let matched = matched.expect("counterpart exists");
        assert_eq!(matched.question, QUESTION);
        assert_eq!(matched.user_answer, "sunshine");
        assert_eq!(matched.partner_answer, "coffee");
    }

    #[tokio::test]
    async fn counterpart_from_previous_day_does_not_match() {
        let store = MemoryAnswerStore::default();
        store.seed("b", "a", QUESTION, "stale", start_of_today() - Duration::hours(1));

        let (_, matched) = submit_and_check(&store, "a", "b", QUESTION, "fresh")
            .await
            .unwrap();
        assert!(matched.is_none());
    }

    #[tokio::test]
    async fn different_question_text_does_not_match() {
        let store = MemoryAnswerStore::default();
        store.seed("b", "a", "Another question?", "coffee", start_of_today() + Duration::seconds(30));

        let (_, matched) = submit_and_check(&store, "a", "b", QUESTION, "sunshine")
            .await
            .unwrap();
        assert!(matched.is_none());
    }

    #[tokio::test]
    async fn answers_in_the_wrong_direction_do_not_match() {
        let store = MemoryAnswerStore::default();
        // Same pair, but authored by the submitter, not the friend.
        store.seed("a", "b", QUESTION, "mine", start_of_today() + Duration::seconds(30));

        let (_, matched) = submit_and_check(&store, "a", "b", QUESTION, "sunshine")
            .await
            .unwrap();
        assert!(matched.is_none());
    }

    #[tokio::test]
    async fn persist_failure_fails_the_operation() {
        let store = MemoryAnswerStore {
            fail_insert: true,
            ..Default::default()
        };
        let result = submit_and_check(&store, "a", "b", QUESTION, "sunshine").await;
        assert!(result.is_err());
        assert!(store.answers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_after_persist_is_tolerated() {
        let store = MemoryAnswerStore {
            fail_lookup: true,
            ..Default::default()
        };
        let (submitted, matched) = submit_and_check(&store, "a", "b", QUESTION, "sunshine")
            .await
            .expect("persist succeeded, failure is swallowed");
        assert_eq!(submitted.answer, "sunshine");
        assert!(matched.is_none());
        // The answer is still durably recorded for the friend's later check.
        assert_eq!(store.answers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn earliest_same_day_counterpart_wins_on_reanswer() {
        let store = MemoryAnswerStore::default();
        store.seed("b", "a", QUESTION, "first", start_of_today() + Duration::minutes(5));
        store.seed("b", "a", QUESTION, "second", start_of_today() + Duration::minutes(10));

        let (_, matched) = submit_and_check(&store, "a", "b", QUESTION, "sunshine")
            .await
            .unwrap();
        assert_eq!(matched.unwrap().partner_answer, "first");
    }
}
