use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AttemptId, QuestionId, SessionId};
use crate::model::question::{Category, OptionIndex, Question};

/// An answer ready to be appended to the result sink.
///
/// Correctness is derived from the question at answer time and never
/// recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttempt {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub category: Category,
    pub selected: OptionIndex,
    pub is_correct: bool,
    pub response_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl NewAttempt {
    #[must_use]
    pub fn for_question(
        session_id: SessionId,
        question: &Question,
        selected: OptionIndex,
        response_ms: Option<u64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            question_id: question.id,
            category: question.category.clone(),
            selected,
            is_correct: question.is_correct(selected),
            response_ms,
            created_at,
        }
    }

    #[must_use]
    pub fn with_id(self, id: AttemptId) -> Attempt {
        Attempt {
            id,
            session_id: self.session_id,
            question_id: self.question_id,
            selected: self.selected,
            is_correct: self.is_correct,
            response_ms: self.response_ms,
            created_at: self.created_at,
        }
    }
}

/// One recorded answer to one question within a session. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected: OptionIndex,
    pub is_correct: bool,
    pub response_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}
