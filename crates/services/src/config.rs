use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use quiz_core::model::Language;

pub const DEFAULT_MAX_QUESTIONS: u32 = 30;
pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// How a session picks the question after the current one.
///
/// Fixed when the session is created; a session never switches modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Shuffle the active set once and serve it in that order.
    #[default]
    Deterministic,
    /// Ask the store for a question from the weakest category after every answer.
    Adaptive,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown selection mode: {0}")]
pub struct ParseModeError(String);

impl FromStr for SelectionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deterministic" | "shuffle" => Ok(Self::Deterministic),
            "adaptive" | "smart" => Ok(Self::Adaptive),
            other => Err(ParseModeError(other.to_owned())),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deterministic => "deterministic",
            Self::Adaptive => "adaptive",
        })
    }
}

/// Knobs for one quiz session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub mode: SelectionMode,
    /// Upper bound on questions served; 0 means unlimited.
    pub max_questions: u32,
    pub language: Language,
    /// Size of the pool the adaptive selector samples from.
    pub candidate_limit: usize,
    /// Applied to every store call.
    pub store_timeout: Duration,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            max_questions: DEFAULT_MAX_QUESTIONS,
            language: Language::default(),
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl QuizConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_questions(mut self, max_questions: u32) -> Self {
        self.max_questions = max_questions;
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn with_candidate_limit(mut self, candidate_limit: usize) -> Self {
        self.candidate_limit = candidate_limit;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// `max_questions` as a cap, `None` when unlimited.
    #[must_use]
    pub fn question_limit(&self) -> Option<usize> {
        match self.max_questions {
            0 => None,
            n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }
}
