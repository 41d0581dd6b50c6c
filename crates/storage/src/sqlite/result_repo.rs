use chrono::{DateTime, Utc};
use quiz_core::model::{Attempt, AttemptId, Category, NewAttempt};

use super::{
    SqliteRepository,
    mapping::{conn, id_i64, map_recent_attempt_row},
};
use crate::repository::{RecentAttempt, ResultSink, StorageError};

#[async_trait::async_trait]
impl ResultSink for SqliteRepository {
    async fn record_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, StorageError> {
        let response_ms = attempt
            .response_ms
            .map(|ms| id_i64("response_time_ms", ms))
            .transpose()?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    session_id, question_id, selected_answer, is_correct,
                    response_time_ms, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(attempt.session_id.to_string())
        .bind(id_i64("question_id", attempt.question_id.value())?)
        .bind(i64::from(attempt.selected.value()))
        .bind(attempt.is_correct)
        .bind(response_ms)
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("attempt id sign overflow".into()))?;
        Ok(attempt.clone().with_id(AttemptId::new(id)))
    }

    async fn increment_category_stat(
        &self,
        category: &Category,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        // Single statement: the increment happens inside SQLite, not read-modify-write.
        sqlx::query(
            r"
                INSERT INTO category_stats (category, total_questions, correct_answers, last_updated)
                VALUES (?1, 1, ?2, ?3)
                ON CONFLICT(category) DO UPDATE SET
                    total_questions = total_questions + 1,
                    correct_answers = correct_answers + excluded.correct_answers,
                    last_updated = excluded.last_updated
            ",
        )
        .bind(category.as_str())
        .bind(i64::from(correct))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn recent_attempts(&self, limit: u32) -> Result<Vec<RecentAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    r.id, r.session_id, r.question_id, r.selected_answer, r.is_correct,
                    r.response_time_ms, r.created_at, q.category
                FROM quiz_results r
                LEFT JOIN questions q ON q.id = r.question_id
                ORDER BY r.created_at DESC, r.id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_recent_attempt_row(&row)?);
        }
        Ok(out)
    }
}
