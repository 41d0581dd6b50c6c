use chrono::{DateTime, Utc};
use quiz_core::model::{
    Attempt, AttemptId, BilingualText, Category, CategoryStat, OptionIndex, Question, QuestionId,
    SessionId,
};
use sqlx::Row;

use crate::repository::{RecentAttempt, StorageError};

/// Column list shared by every question query, in `map_question_row` order.
pub(crate) const QUESTION_COLUMNS: &str = r"
    id, category, question_he, question_fa,
    option_a_he, option_a_fa, option_b_he, option_b_fa,
    option_c_he, option_c_fa, option_d_he, option_d_fa,
    correct_answer, explanation_he, explanation_fa, is_active
";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

fn bilingual(row: &sqlx::sqlite::SqliteRow, prefix: &str) -> Result<BilingualText, StorageError> {
    let he: String = row.try_get(format!("{prefix}_he").as_str()).map_err(ser)?;
    let fa: String = row.try_get(format!("{prefix}_fa").as_str()).map_err(ser)?;
    BilingualText::new(he, fa).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    Ok(Question {
        id: question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        category: Category::new(row.try_get::<String, _>("category").map_err(ser)?).map_err(ser)?,
        prompt: bilingual(row, "question")?,
        options: [
            bilingual(row, "option_a")?,
            bilingual(row, "option_b")?,
            bilingual(row, "option_c")?,
            bilingual(row, "option_d")?,
        ],
        correct_option: OptionIndex::from_i64(row.try_get::<i64, _>("correct_answer").map_err(ser)?)
            .map_err(ser)?,
        explanation: bilingual(row, "explanation")?,
        active: row.try_get::<bool, _>("is_active").map_err(ser)?,
    })
}

pub(crate) fn map_category_stat_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CategoryStat, StorageError> {
    let category = Category::new(row.try_get::<String, _>("category").map_err(ser)?).map_err(ser)?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let correct = u32_from_i64(
        "correct_answers",
        row.try_get::<i64, _>("correct_answers").map_err(ser)?,
    )?;
    let last_updated: DateTime<Utc> = row.try_get("last_updated").map_err(ser)?;

    CategoryStat::from_persisted(category, total, correct, last_updated).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<Attempt, StorageError> {
    let session_raw: String = row.try_get("session_id").map_err(ser)?;
    let session_id: SessionId = session_raw.parse().map_err(ser)?;
    let response_ms = row
        .try_get::<Option<i64>, _>("response_time_ms")
        .map_err(ser)?
        .map(|v| i64_to_u64("response_time_ms", v))
        .transpose()?;

    Ok(Attempt {
        id: AttemptId::new(i64_to_u64("id", row.try_get::<i64, _>("id").map_err(ser)?)?),
        session_id,
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        selected: OptionIndex::from_i64(row.try_get::<i64, _>("selected_answer").map_err(ser)?)
            .map_err(ser)?,
        is_correct: row.try_get::<bool, _>("is_correct").map_err(ser)?,
        response_ms,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

/// Maps a `quiz_results LEFT JOIN questions` row.
pub(crate) fn map_recent_attempt_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<RecentAttempt, StorageError> {
    let category = row
        .try_get::<Option<String>, _>("category")
        .map_err(ser)?
        .map(Category::new)
        .transpose()
        .map_err(ser)?;
    Ok(RecentAttempt {
        attempt: map_attempt_row(row)?,
        category,
    })
}
