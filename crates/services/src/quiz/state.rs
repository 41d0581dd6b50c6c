use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptId, Category, NewAttempt, OptionIndex, QuestionId};

use crate::error::{LoadError, PersistenceError};

/// Where a session is in its lifecycle.
///
/// `Loading → {Error | Ready}`, `Ready → AwaitingAnswer → Answered →
/// (Ready | Complete)`. `Error` and `Complete` go back to `Loading` on retry
/// or reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizPhase {
    Loading,
    Error(LoadError),
    /// A question is loaded but has not been displayed yet.
    Ready,
    AwaitingAnswer,
    Answered,
    Complete,
}

impl QuizPhase {
    /// A question is loaded and can be shown.
    #[must_use]
    pub fn has_question(&self) -> bool {
        matches!(self, Self::Ready | Self::AwaitingAnswer | Self::Answered)
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// `start` has something to do from here.
    #[must_use]
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Loading | Self::Error(_))
    }
}

/// Local result of one accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// The attempt as it is handed to the result sink.
    pub attempt: NewAttempt,
    pub correct_option: OptionIndex,
}

impl AnswerOutcome {
    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.attempt.question_id
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        &self.attempt.category
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.attempt.is_correct
    }

    #[must_use]
    pub fn response_ms(&self) -> Option<u64> {
        self.attempt.response_ms
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.attempt.created_at
    }
}

/// What `QuizLoopService::answer` returns for an accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswer {
    pub outcome: AnswerOutcome,
    /// Id assigned by the sink, `None` when the write failed.
    pub attempt_id: Option<AttemptId>,
    pub persistence_errors: Vec<PersistenceError>,
}

impl QuizAnswer {
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persistence_errors.is_empty()
    }
}
