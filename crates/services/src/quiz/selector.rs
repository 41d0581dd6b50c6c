use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use quiz_core::model::{Question, QuestionId};
use quiz_core::selection::{pick_uniform, weakest_category};
use storage::repository::QuestionStore;

use crate::deadline::within;
use crate::error::LoadError;

/// Category-weighted choice of the next question.
///
/// Stateless per call: category stats are fetched fresh every time so the
/// choice reflects the latest persisted attempts.
#[derive(Clone)]
pub struct AdaptiveSelector {
    questions: Arc<dyn QuestionStore>,
    candidate_limit: usize,
    timeout: Duration,
}

impl AdaptiveSelector {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionStore>, candidate_limit: usize, timeout: Duration) -> Self {
        Self {
            questions,
            candidate_limit: candidate_limit.max(1),
            timeout,
        }
    }

    /// Up to `candidate_limit` unanswered questions, preferring the weakest
    /// category and falling back to any category.
    ///
    /// An empty result means every active question has been answered.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if a store read fails or times out.
    pub async fn candidates(&self, answered: &[QuestionId]) -> Result<Vec<Question>, LoadError> {
        let stats = within(self.timeout, self.questions.fetch_category_stats()).await?;

        if let Some(category) = weakest_category(&stats) {
            let mut pool = within(
                self.timeout,
                self.questions
                    .fetch_candidates(Some(category), answered, self.candidate_limit),
            )
            .await?;
            pool.retain(|q| !answered.contains(&q.id));
            if !pool.is_empty() {
                tracing::debug!(%category, candidates = pool.len(), "drawing from weakest category");
                return Ok(pool);
            }
            tracing::debug!(%category, "weakest category exhausted, widening to all categories");
        }

        let mut pool = within(
            self.timeout,
            self.questions
                .fetch_candidates(None, answered, self.candidate_limit),
        )
        .await?;
        pool.retain(|q| !answered.contains(&q.id));
        tracing::debug!(candidates = pool.len(), "drawing from all categories");
        Ok(pool)
    }

    /// Uniform pick from a candidate set.
    pub fn choose<R: Rng>(candidates: &[Question], rng: &mut R) -> Option<Question> {
        pick_uniform(candidates, rng).cloned()
    }

    /// `candidates` followed by `choose`. `None` ends the quiz.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if a store read fails or times out.
    pub async fn select_next<R: Rng + Send>(
        &self,
        answered: &[QuestionId],
        rng: &mut R,
    ) -> Result<Option<Question>, LoadError> {
        let candidates = self.candidates(answered).await?;
        Ok(Self::choose(&candidates, rng))
    }
}
