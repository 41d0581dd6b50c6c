//! PostgREST row shapes for the driving-quiz tables.

use chrono::{DateTime, Utc};
use quiz_core::model::{
    Attempt, AttemptId, BilingualText, Category, CategoryStat, NewAttempt, OptionIndex, Question,
    QuestionId,
};
use serde::{Deserialize, Serialize};

use crate::repository::{RecentAttempt, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn non_negative(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn counter(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuestionRow {
    pub id: i64,
    pub category: String,
    pub question_he: String,
    pub question_fa: String,
    pub option_a_he: String,
    pub option_a_fa: String,
    pub option_b_he: String,
    pub option_b_fa: String,
    pub option_c_he: String,
    pub option_c_fa: String,
    pub option_d_he: String,
    pub option_d_fa: String,
    pub correct_answer: i64,
    pub explanation_he: String,
    pub explanation_fa: String,
    #[serde(default = "active_default")]
    pub is_active: bool,
}

fn active_default() -> bool {
    true
}

impl QuestionRow {
    pub fn from_question(question: &Question) -> Result<Self, StorageError> {
        let [a, b, c, d] = &question.options;
        Ok(Self {
            id: i64::try_from(question.id.value())
                .map_err(|_| StorageError::Serialization("question_id overflow".into()))?,
            category: question.category.as_str().to_owned(),
            question_he: question.prompt.hebrew().to_owned(),
            question_fa: question.prompt.persian().to_owned(),
            option_a_he: a.hebrew().to_owned(),
            option_a_fa: a.persian().to_owned(),
            option_b_he: b.hebrew().to_owned(),
            option_b_fa: b.persian().to_owned(),
            option_c_he: c.hebrew().to_owned(),
            option_c_fa: c.persian().to_owned(),
            option_d_he: d.hebrew().to_owned(),
            option_d_fa: d.persian().to_owned(),
            correct_answer: i64::from(question.correct_option.value()),
            explanation_he: question.explanation.hebrew().to_owned(),
            explanation_fa: question.explanation.persian().to_owned(),
            is_active: question.active,
        })
    }

    pub fn into_question(self) -> Result<Question, StorageError> {
        Ok(Question {
            id: QuestionId::new(non_negative("id", self.id)?),
            category: Category::new(self.category).map_err(ser)?,
            prompt: BilingualText::new(self.question_he, self.question_fa).map_err(ser)?,
            options: [
                BilingualText::new(self.option_a_he, self.option_a_fa).map_err(ser)?,
                BilingualText::new(self.option_b_he, self.option_b_fa).map_err(ser)?,
                BilingualText::new(self.option_c_he, self.option_c_fa).map_err(ser)?,
                BilingualText::new(self.option_d_he, self.option_d_fa).map_err(ser)?,
            ],
            correct_option: OptionIndex::from_i64(self.correct_answer).map_err(ser)?,
            explanation: BilingualText::new(self.explanation_he, self.explanation_fa)
                .map_err(ser)?,
            active: self.is_active,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct CategoryStatRow {
    pub category: String,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub last_updated: DateTime<Utc>,
}

impl CategoryStatRow {
    pub fn into_stat(self) -> Result<CategoryStat, StorageError> {
        CategoryStat::from_persisted(
            Category::new(self.category).map_err(ser)?,
            counter("total_questions", self.total_questions)?,
            counter("correct_answers", self.correct_answers)?,
            self.last_updated,
        )
        .map_err(ser)
    }
}

/// Insert payload for `driving_quiz_results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct NewResultRow {
    pub session_id: String,
    pub question_id: i64,
    pub selected_answer: i64,
    pub is_correct: bool,
    pub response_time: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl NewResultRow {
    pub fn from_attempt(attempt: &NewAttempt) -> Result<Self, StorageError> {
        Ok(Self {
            session_id: attempt.session_id.to_string(),
            question_id: i64::try_from(attempt.question_id.value())
                .map_err(|_| StorageError::Serialization("question_id overflow".into()))?,
            selected_answer: i64::from(attempt.selected.value()),
            is_correct: attempt.is_correct,
            response_time: attempt
                .response_ms
                .map(|ms| {
                    i64::try_from(ms).map_err(|_| {
                        StorageError::Serialization("response_time overflow".into())
                    })
                })
                .transpose()?,
            created_at: attempt.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct EmbeddedCategory {
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ResultRow {
    pub id: i64,
    pub session_id: String,
    pub question_id: i64,
    pub selected_answer: i64,
    pub is_correct: bool,
    pub response_time: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub driving_questions: Option<EmbeddedCategory>,
}

impl ResultRow {
    pub fn into_attempt(self) -> Result<Attempt, StorageError> {
        Ok(Attempt {
            id: AttemptId::new(non_negative("id", self.id)?),
            session_id: self.session_id.parse().map_err(ser)?,
            question_id: QuestionId::new(non_negative("question_id", self.question_id)?),
            selected: OptionIndex::from_i64(self.selected_answer).map_err(ser)?,
            is_correct: self.is_correct,
            response_ms: self
                .response_time
                .map(|v| non_negative("response_time", v))
                .transpose()?,
            created_at: self.created_at,
        })
    }

    pub fn into_recent(mut self) -> Result<RecentAttempt, StorageError> {
        let category = self
            .driving_questions
            .take()
            .map(|embedded| Category::new(embedded.category))
            .transpose()
            .map_err(ser)?;
        Ok(RecentAttempt {
            attempt: self.into_attempt()?,
            category,
        })
    }
}
