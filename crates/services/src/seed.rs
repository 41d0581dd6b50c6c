//! Bulk import of authored questions.

use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{Question, QuestionDraft, QuestionId};
use storage::repository::QuestionStore;

use crate::config::DEFAULT_STORE_TIMEOUT;
use crate::deadline::within;
use crate::error::SeedError;

/// Parse a JSON array of question drafts into validated questions.
///
/// Drafts without an `id` are numbered after the highest explicit id in the
/// file, in file order.
///
/// # Errors
///
/// Returns `SeedError::Parse` for malformed JSON, `SeedError::Invalid` for
/// the first draft that fails validation, and `SeedError::IdsExhausted` when
/// an unnumbered draft would need an id past `u64::MAX`.
pub fn parse_questions(json: &str) -> Result<Vec<Question>, SeedError> {
    let drafts: Vec<QuestionDraft> = serde_json::from_str(json)?;
    let mut next_id = drafts.iter().filter_map(|d| d.id).max().unwrap_or(0);

    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            let id = match draft.id {
                Some(id) => id,
                None => {
                    next_id = next_id
                        .checked_add(1)
                        .ok_or(SeedError::IdsExhausted { index })?;
                    next_id
                }
            };
            draft
                .validate()
                .map(|q| q.assign_id(QuestionId::new(id)))
                .map_err(|source| SeedError::Invalid { index, source })
        })
        .collect()
}

/// Writes parsed questions into a store.
#[derive(Clone)]
pub struct SeedService {
    questions: Arc<dyn QuestionStore>,
    timeout: Duration,
}

impl SeedService {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionStore>) -> Self {
        Self {
            questions,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upsert every question; returns how many were written.
    ///
    /// # Errors
    ///
    /// Stops at the first failing write with `SeedError`.
    pub async fn upsert_all(&self, questions: &[Question]) -> Result<usize, SeedError> {
        for question in questions {
            within(self.timeout, self.questions.upsert_question(question)).await?;
        }
        tracing::info!(count = questions.len(), "questions seeded");
        Ok(questions.len())
    }

    /// `parse_questions` followed by `upsert_all`.
    ///
    /// # Errors
    ///
    /// Returns `SeedError` from either step; nothing is written if parsing fails.
    pub async fn seed_json(&self, json: &str) -> Result<usize, SeedError> {
        let questions = parse_questions(json)?;
        self.upsert_all(&questions).await
    }
}
