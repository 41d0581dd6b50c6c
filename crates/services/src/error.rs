//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionError, QuestionId};
use storage::repository::StorageError;

use crate::deadline::StoreCallError;

/// The question set could not be loaded. Retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to fetch questions: {0}")]
    Fetch(#[from] StorageError),
    #[error("no questions available")]
    Empty,
    #[error("question store did not answer in time")]
    Timeout,
}

impl From<StoreCallError> for LoadError {
    fn from(err: StoreCallError) -> Self {
        match err {
            StoreCallError::Storage(e) => Self::Fetch(e),
            StoreCallError::Timeout => Self::Timeout,
        }
    }
}

/// A write to the result sink failed. Logged, never blocks the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("failed to record attempt: {0}")]
    Attempt(StorageError),
    #[error("failed to update category stat: {0}")]
    CategoryStat(StorageError),
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },
}

impl PersistenceError {
    pub(crate) fn attempt(err: StoreCallError) -> Self {
        match err {
            StoreCallError::Storage(e) => Self::Attempt(e),
            StoreCallError::Timeout => Self::Timeout {
                operation: "record_attempt",
            },
        }
    }

    pub(crate) fn category_stat(err: StoreCallError) -> Self {
        match err {
            StoreCallError::Storage(e) => Self::CategoryStat(e),
            StoreCallError::Timeout => Self::Timeout {
                operation: "increment_category_stat",
            },
        }
    }
}

/// Why `answer` was ignored.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerRejected {
    #[error("no question is loaded")]
    NoCurrentQuestion,
    #[error("current question was already answered")]
    AlreadyAnswered,
    #[error("answer targets {received:?} but the current question is {expected:?}")]
    QuestionMismatch {
        expected: QuestionId,
        received: QuestionId,
    },
    #[error("quiz is complete")]
    Finished,
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("statistics request timed out")]
    Timeout,
}

impl From<StoreCallError> for StatsError {
    fn from(err: StoreCallError) -> Self {
        match err {
            StoreCallError::Storage(e) => Self::Storage(e),
            StoreCallError::Timeout => Self::Timeout,
        }
    }
}

/// Errors emitted while seeding questions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question #{index} is invalid: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: QuestionError,
    },
    #[error("question #{index} has no id and none is left after the highest explicit id")]
    IdsExhausted { index: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("question store did not answer in time")]
    Timeout,
}

impl From<StoreCallError> for SeedError {
    fn from(err: StoreCallError) -> Self {
        match err {
            StoreCallError::Storage(e) => Self::Storage(e),
            StoreCallError::Timeout => Self::Timeout,
        }
    }
}
