use std::sync::{Arc, Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;

use quiz_core::model::{OptionIndex, Question, QuestionId};
use storage::repository::{QuestionStore, ResultSink, Storage};

use crate::Clock;
use crate::config::{QuizConfig, SelectionMode};
use crate::deadline::within;
use crate::error::{LoadError, PersistenceError};
use super::selector::AdaptiveSelector;
use super::session::QuizSession;
use super::state::QuizAnswer;

/// Orchestrates quiz sessions against the question store and result sink.
///
/// Every store call is bounded by `QuizConfig::store_timeout`. Reads that fail
/// surface as `LoadError`; writes that fail are logged and reported on the
/// returned `QuizAnswer` but never undo local state.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionStore>,
    results: Arc<dyn ResultSink>,
    config: QuizConfig,
    rng: Arc<Mutex<StdRng>>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionStore>,
        results: Arc<dyn ResultSink>,
        config: QuizConfig,
    ) -> Self {
        Self {
            clock,
            questions,
            results,
            config,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, config: QuizConfig) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.results),
            config,
        )
    }

    /// Use a seeded generator so shuffles and picks are reproducible.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// A fresh session in `Loading` using this service's configuration.
    #[must_use]
    pub fn new_session(&self) -> QuizSession {
        QuizSession::new(self.config.clone())
    }

    fn selector(&self) -> AdaptiveSelector {
        AdaptiveSelector::new(
            Arc::clone(&self.questions),
            self.config.candidate_limit,
            self.config.store_timeout,
        )
    }

    // The guard never lives across an await.
    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Load the active question set into `session`.
    ///
    /// Runs from `Loading` and `Error` (retry); in any other phase it does
    /// nothing. On failure the session enters `Error`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` when the fetch fails, times out, or yields no
    /// active question.
    pub async fn start(&self, session: &mut QuizSession) -> Result<(), LoadError> {
        if !session.phase().can_start() {
            tracing::debug!(session = %session.id(), "start ignored, session already running");
            return Ok(());
        }
        session.begin_loading();

        let pool = match within(self.config.store_timeout, self.questions.fetch_all_active()).await {
            Ok(pool) => pool,
            Err(err) => {
                let err = LoadError::from(err);
                tracing::warn!(session = %session.id(), error = %err, "failed to load questions");
                session.fail(err.clone());
                return Err(err);
            }
        };

        let now = self.clock.now();
        let loaded = self.with_rng(|rng| session.load(pool, rng, now));
        match &loaded {
            Ok(()) => tracing::info!(
                session = %session.id(),
                mode = %session.mode(),
                planned = session.planned(),
                "quiz session started"
            ),
            Err(err) => tracing::warn!(session = %session.id(), error = %err, "quiz session not started"),
        }
        loaded
    }

    /// Mark the current question as displayed and return it.
    pub fn present<'s>(&self, session: &'s mut QuizSession) -> Option<&'s Question> {
        session.present(self.clock.now())
    }

    /// Answer the current question and persist the attempt.
    ///
    /// Returns `None` when the session rejects the answer (no open question,
    /// already answered, wrong id, complete); nothing is written then.
    /// Persistence failures are logged and listed on the result while the
    /// session keeps the outcome.
    pub async fn answer(
        &self,
        session: &mut QuizSession,
        question_id: QuestionId,
        selected: OptionIndex,
    ) -> Option<QuizAnswer> {
        let now = self.clock.now();
        let outcome = match session.answer(question_id, selected, now) {
            Ok(outcome) => outcome.clone(),
            Err(reason) => {
                tracing::debug!(session = %session.id(), %question_id, %reason, "answer ignored");
                return None;
            }
        };

        let mut persistence_errors = Vec::new();
        let attempt_id =
            match within(self.config.store_timeout, self.results.record_attempt(&outcome.attempt))
                .await
            {
                Ok(stored) => Some(stored.id),
                Err(err) => {
                    let err = PersistenceError::attempt(err);
                    tracing::warn!(session = %session.id(), %question_id, error = %err, "attempt not persisted");
                    persistence_errors.push(err);
                    None
                }
            };

        let increment = self.results.increment_category_stat(
            outcome.category(),
            outcome.is_correct(),
            now,
        );
        if let Err(err) = within(self.config.store_timeout, increment).await {
            let err = PersistenceError::category_stat(err);
            tracing::warn!(
                session = %session.id(),
                category = %outcome.category(),
                error = %err,
                "category stat not updated"
            );
            persistence_errors.push(err);
        }

        Some(QuizAnswer {
            outcome,
            attempt_id,
            persistence_errors,
        })
    }

    /// Move past an answered question.
    ///
    /// No-op unless the current question has been answered, so calling it
    /// after `Complete` leaves the session complete.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if the adaptive selector cannot read the store. The
    /// session stays in `Answered` and the call can be retried.
    pub async fn advance(&self, session: &mut QuizSession) -> Result<(), LoadError> {
        if !session.phase().is_answered() {
            return Ok(());
        }

        match session.mode() {
            SelectionMode::Deterministic => {
                session.advance_in_order(self.clock.now());
            }
            SelectionMode::Adaptive => {
                let next = if session.quota_reached() {
                    None
                } else {
                    let candidates = match self.selector().candidates(session.answered_ids()).await {
                        Ok(candidates) => candidates,
                        Err(err) => {
                            tracing::warn!(session = %session.id(), error = %err, "next question unavailable");
                            return Err(err);
                        }
                    };
                    self.with_rng(|rng| AdaptiveSelector::choose(&candidates, rng))
                };
                session.advance_with(next, self.clock.now());
            }
        }

        if session.phase().is_complete() {
            let stats = session.running_stats();
            tracing::info!(
                session = %session.id(),
                answered = stats.answered(),
                success_rate = stats.success_rate(),
                "quiz session complete"
            );
        }
        Ok(())
    }

    /// Discard `session` and start a new run under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` as `start` does.
    pub async fn reset(&self, session: &mut QuizSession) -> Result<(), LoadError> {
        session.reset();
        self.start(session).await
    }
}
