use chrono::{DateTime, Utc};
use rand::Rng;

use quiz_core::model::{
    Language, LocalizedQuestion, NewAttempt, OptionIndex, Question, QuestionId, SessionId,
    SessionRunningStats,
};
use quiz_core::selection::{fisher_yates_shuffle, pick_uniform};
use quiz_core::time::elapsed_millis;

use crate::config::{QuizConfig, SelectionMode};
use crate::error::{AnswerRejected, LoadError};
use super::progress::QuizProgress;
use super::report::QuizReport;
use super::state::{AnswerOutcome, QuizPhase};

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz run, owned by the caller.
///
/// Holds no store handles: `QuizLoopService` fetches data and feeds it in, so
/// every transition here is synchronous and deterministic given its inputs.
/// Dropping the session discards it; nothing is written on its behalf after
/// that.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: SessionId,
    config: QuizConfig,
    phase: QuizPhase,
    /// Deterministic mode: the shuffled, truncated run. Adaptive mode: the
    /// questions served so far.
    queue: Vec<Question>,
    cursor: usize,
    pool_size: usize,
    displayed_at: Option<DateTime<Utc>>,
    answered_ids: Vec<QuestionId>,
    outcomes: Vec<AnswerOutcome>,
    stats: SessionRunningStats,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// A fresh session in `Loading` with a newly generated id.
    #[must_use]
    pub fn new(config: QuizConfig) -> Self {
        Self {
            id: SessionId::generate(),
            config,
            phase: QuizPhase::Loading,
            queue: Vec::new(),
            cursor: 0,
            pool_size: 0,
            displayed_at: None,
            answered_ids: Vec::new(),
            outcomes: Vec::new(),
            stats: SessionRunningStats::new(),
            started_at: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.config.mode
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.config.language
    }

    #[must_use]
    pub fn phase(&self) -> &QuizPhase {
        &self.phase
    }

    #[must_use]
    pub fn running_stats(&self) -> &SessionRunningStats {
        &self.stats
    }

    #[must_use]
    pub fn answered_ids(&self) -> &[QuestionId] {
        &self.answered_ids
    }

    #[must_use]
    pub fn outcomes(&self) -> &[AnswerOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<&AnswerOutcome> {
        self.outcomes.last()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.phase.has_question() {
            self.queue.get(self.cursor)
        } else {
            None
        }
    }

    /// The current question resolved in the session language.
    #[must_use]
    pub fn localized_current(&self) -> Option<LocalizedQuestion<'_>> {
        self.current_question()
            .map(|q| q.localized(self.config.language))
    }

    /// Questions this run expects to serve.
    #[must_use]
    pub fn planned(&self) -> usize {
        match self.config.mode {
            SelectionMode::Deterministic => self.queue.len(),
            SelectionMode::Adaptive => self
                .config
                .question_limit()
                .map_or(self.pool_size, |limit| limit.min(self.pool_size)),
        }
    }

    /// Adaptive mode: `max_questions` answers have been accepted.
    #[must_use]
    pub fn quota_reached(&self) -> bool {
        self.config
            .question_limit()
            .is_some_and(|limit| self.answered_ids.len() >= limit)
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let answered = self.answered_ids.len();
        QuizProgress {
            position: if self.phase.has_question() {
                self.cursor + 1
            } else {
                answered
            },
            planned: self.planned(),
            answered,
            is_complete: self.phase.is_complete(),
        }
    }

    #[must_use]
    pub fn report(&self) -> QuizReport {
        QuizReport::from_running(self.id, &self.stats, self.started_at, self.completed_at)
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Drop per-run state and enter `Loading`, keeping the session id.
    pub fn begin_loading(&mut self) {
        self.clear_run();
        self.phase = QuizPhase::Loading;
    }

    /// Record a load failure.
    pub fn fail(&mut self, err: LoadError) {
        self.clear_run();
        self.phase = QuizPhase::Error(err);
    }

    /// Install the fetched question set and move to `Ready`.
    ///
    /// Deterministic mode shuffles the whole set once and truncates it to
    /// `max_questions`. Adaptive mode picks one question uniformly and
    /// remembers the pool size for progress reporting.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Empty` (and enters `Error`) if no active question
    /// was supplied.
    pub fn load<R: Rng>(
        &mut self,
        mut pool: Vec<Question>,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), LoadError> {
        self.clear_run();
        pool.retain(|q| q.active);
        if pool.is_empty() {
            self.phase = QuizPhase::Error(LoadError::Empty);
            return Err(LoadError::Empty);
        }

        self.pool_size = pool.len();
        match self.config.mode {
            SelectionMode::Deterministic => {
                fisher_yates_shuffle(&mut pool, rng);
                if let Some(limit) = self.config.question_limit() {
                    pool.truncate(limit);
                }
                self.queue = pool;
            }
            SelectionMode::Adaptive => {
                self.queue.extend(pick_uniform(&pool, rng).cloned());
            }
        }

        self.started_at = Some(now);
        self.phase = QuizPhase::Ready;
        Ok(())
    }

    /// Mark the current question as displayed and return it.
    ///
    /// Latency is measured from the first call; repeated calls keep the
    /// original display time.
    pub fn present(&mut self, now: DateTime<Utc>) -> Option<&Question> {
        match self.phase {
            QuizPhase::Ready => {
                self.phase = QuizPhase::AwaitingAnswer;
                self.displayed_at = Some(now);
            }
            QuizPhase::AwaitingAnswer | QuizPhase::Answered => {}
            _ => return None,
        }
        self.queue.get(self.cursor)
    }

    /// Accept an answer for the current question.
    ///
    /// At most one answer is accepted per served question. Rejected calls
    /// leave the session untouched.
    ///
    /// # Errors
    ///
    /// Returns `AnswerRejected` when no question is open, the current one was
    /// already answered, `question_id` is not the current question, or the
    /// quiz is complete.
    pub fn answer(
        &mut self,
        question_id: QuestionId,
        selected: OptionIndex,
        now: DateTime<Utc>,
    ) -> Result<&AnswerOutcome, AnswerRejected> {
        let response_ms = match self.phase {
            QuizPhase::Ready => None,
            QuizPhase::AwaitingAnswer => self.displayed_at.map(|at| elapsed_millis(at, now)),
            QuizPhase::Answered => return Err(AnswerRejected::AlreadyAnswered),
            QuizPhase::Complete => return Err(AnswerRejected::Finished),
            QuizPhase::Loading | QuizPhase::Error(_) => {
                return Err(AnswerRejected::NoCurrentQuestion);
            }
        };

        let question = self
            .queue
            .get(self.cursor)
            .ok_or(AnswerRejected::NoCurrentQuestion)?;
        if question.id != question_id {
            return Err(AnswerRejected::QuestionMismatch {
                expected: question.id,
                received: question_id,
            });
        }

        let outcome = AnswerOutcome {
            attempt: NewAttempt::for_question(self.id, question, selected, response_ms, now),
            correct_option: question.correct_option,
        };
        self.stats
            .record(&outcome.attempt.category, outcome.attempt.is_correct);
        self.answered_ids.push(question_id);
        self.phase = QuizPhase::Answered;
        self.outcomes.push(outcome);
        self.outcomes
            .last()
            .ok_or(AnswerRejected::NoCurrentQuestion)
    }

    /// Deterministic mode: step to the next queued question or complete.
    ///
    /// No-op unless the current question has been answered.
    pub fn advance_in_order(&mut self, now: DateTime<Utc>) -> &QuizPhase {
        if !self.phase.is_answered() {
            return &self.phase;
        }
        if self.cursor + 1 < self.queue.len() {
            self.cursor += 1;
            self.displayed_at = None;
            self.phase = QuizPhase::Ready;
        } else {
            self.complete(now);
        }
        &self.phase
    }

    /// Adaptive mode: serve `next`, or complete when there is none or the
    /// quota is reached.
    ///
    /// No-op unless the current question has been answered. A `next` that was
    /// already answered in this session is treated as none.
    pub fn advance_with(&mut self, next: Option<Question>, now: DateTime<Utc>) -> &QuizPhase {
        if !self.phase.is_answered() {
            return &self.phase;
        }
        let next = next.filter(|q| !self.answered_ids.contains(&q.id));
        match next {
            Some(question) if !self.quota_reached() => {
                self.queue.push(question);
                self.cursor = self.queue.len() - 1;
                self.displayed_at = None;
                self.phase = QuizPhase::Ready;
            }
            _ => self.complete(now),
        }
        &self.phase
    }

    /// Discard everything and start over in `Loading` under a new id.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn complete(&mut self, now: DateTime<Utc>) {
        self.displayed_at = None;
        self.completed_at = Some(now);
        self.phase = QuizPhase::Complete;
    }

    fn clear_run(&mut self) {
        self.queue.clear();
        self.cursor = 0;
        self.pool_size = 0;
        self.displayed_at = None;
        self.answered_ids.clear();
        self.outcomes.clear();
        self.stats = SessionRunningStats::new();
        self.started_at = None;
        self.completed_at = None;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{QuestionDraft, TextDraft};
    use quiz_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build_question(id: u64, category: &str, correct: u8) -> Question {
        let t = |s: &str| TextDraft {
            he: format!("{s} he"),
            fa: format!("{s} fa"),
        };
        QuestionDraft {
            id: None,
            category: category.into(),
            prompt: t("Q"),
            options: [t("A"), t("B"), t("C"), t("D")],
            correct_option: correct,
            explanation: t("E"),
            active: true,
        }
        .validate()
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    fn opt(i: u8) -> OptionIndex {
        OptionIndex::new(i).unwrap()
    }

    fn loaded(config: QuizConfig, questions: Vec<Question>) -> QuizSession {
        let mut session = QuizSession::new(config);
        let mut rng = StdRng::seed_from_u64(7);
        session.load(questions, &mut rng, fixed_now()).unwrap();
        session
    }

    fn current_id(session: &QuizSession) -> QuestionId {
        session.current_question().unwrap().id
    }

    #[test]
    fn two_question_run_scores_fifty_percent() {
        let questions = vec![build_question(1, "signs", 1), build_question(2, "rules", 0)];
        let mut session = loaded(QuizConfig::default(), questions);
        let now = fixed_now();

        while !session.phase().is_complete() {
            session.present(now);
            let id = current_id(&session);
            session.answer(id, opt(1), now).unwrap();
            session.advance_in_order(now);
        }

        let stats = session.running_stats();
        assert_eq!((stats.correct(), stats.incorrect()), (1, 1));
        assert_eq!(session.report().success_rate, 50);
        assert_eq!(session.completed_at(), Some(now));
    }

    #[test]
    fn truncates_to_max_questions() {
        let questions = (1..=5).map(|id| build_question(id, "signs", 0)).collect();
        let mut session = loaded(QuizConfig::default().with_max_questions(1), questions);
        assert_eq!(session.progress().planned, 1);

        let id = current_id(&session);
        session.answer(id, opt(0), fixed_now()).unwrap();
        assert!(session.advance_in_order(fixed_now()).is_complete());
        assert_eq!(session.answered_ids().len(), 1);
    }

    #[test]
    fn unlimited_serves_every_active_question() {
        let mut questions: Vec<_> = (1..=4).map(|id| build_question(id, "signs", 0)).collect();
        questions[2].active = false;
        let session = loaded(QuizConfig::default().with_max_questions(0), questions);
        assert_eq!(session.progress().planned, 3);
    }

    #[test]
    fn empty_pool_enters_error() {
        let mut session = QuizSession::new(QuizConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            session.load(Vec::new(), &mut rng, fixed_now()),
            Err(LoadError::Empty)
        );
        assert_eq!(session.phase(), &QuizPhase::Error(LoadError::Empty));
        assert!(session.phase().can_start());
    }

    #[test]
    fn second_answer_is_rejected_without_touching_stats() {
        let mut session = loaded(QuizConfig::default(), vec![build_question(1, "signs", 2)]);
        let id = current_id(&session);
        session.answer(id, opt(2), fixed_now()).unwrap();
        let before = session.running_stats().clone();

        assert_eq!(
            session.answer(id, opt(0), fixed_now()),
            Err(AnswerRejected::AlreadyAnswered)
        );
        assert_eq!(session.running_stats(), &before);
        assert_eq!(session.outcomes().len(), 1);
    }

    #[test]
    fn answer_for_another_question_is_rejected() {
        let mut session = loaded(QuizConfig::default(), vec![build_question(1, "signs", 0)]);
        let err = session
            .answer(QuestionId::new(9), opt(0), fixed_now())
            .unwrap_err();
        assert!(matches!(err, AnswerRejected::QuestionMismatch { .. }));
        assert_eq!(session.running_stats().answered(), 0);
    }

    #[test]
    fn answer_before_load_is_rejected() {
        let mut session = QuizSession::new(QuizConfig::default());
        assert_eq!(
            session.answer(QuestionId::new(1), opt(0), fixed_now()),
            Err(AnswerRejected::NoCurrentQuestion)
        );
    }

    #[test]
    fn latency_is_measured_from_display() {
        let mut session = loaded(QuizConfig::default(), vec![build_question(1, "signs", 0)]);
        let shown = fixed_now();
        session.present(shown);
        // re-render must not restart the timer
        session.present(shown + Duration::seconds(1));

        let id = current_id(&session);
        let outcome = session
            .answer(id, opt(0), shown + Duration::milliseconds(2_500))
            .unwrap();
        assert_eq!(outcome.response_ms(), Some(2_500));
        assert!(outcome.is_correct());
    }

    #[test]
    fn answer_without_display_has_no_latency() {
        let mut session = loaded(QuizConfig::default(), vec![build_question(1, "signs", 0)]);
        let id = current_id(&session);
        let outcome = session.answer(id, opt(3), fixed_now()).unwrap();
        assert_eq!(outcome.response_ms(), None);
        assert_eq!(outcome.correct_option, opt(0));
    }

    #[test]
    fn advance_is_a_no_op_until_answered_and_after_complete() {
        let mut session = loaded(QuizConfig::default(), vec![build_question(1, "signs", 0)]);
        assert_eq!(session.advance_in_order(fixed_now()), &QuizPhase::Ready);

        let id = current_id(&session);
        session.answer(id, opt(0), fixed_now()).unwrap();
        assert!(session.advance_in_order(fixed_now()).is_complete());

        let later = fixed_now() + Duration::minutes(5);
        assert!(session.advance_in_order(later).is_complete());
        assert!(session.advance_with(None, later).is_complete());
        assert_eq!(session.completed_at(), Some(fixed_now()));
        assert_eq!(
            session.answer(id, opt(0), later),
            Err(AnswerRejected::Finished)
        );
    }

    #[test]
    fn adaptive_serves_supplied_questions_and_skips_repeats() {
        let config = QuizConfig::default().with_mode(SelectionMode::Adaptive);
        let pool = vec![build_question(1, "signs", 0), build_question(2, "rules", 0)];
        let mut session = loaded(config, pool.clone());
        assert_eq!(session.progress().planned, 2);

        let first = current_id(&session);
        session.answer(first, opt(0), fixed_now()).unwrap();
        let repeat = pool.iter().find(|q| q.id == first).cloned();
        assert!(session.advance_with(repeat, fixed_now()).is_complete());
    }

    #[test]
    fn adaptive_honours_quota() {
        let config = QuizConfig::default()
            .with_mode(SelectionMode::Adaptive)
            .with_max_questions(1);
        let pool = vec![build_question(1, "signs", 0), build_question(2, "signs", 0)];
        let mut session = loaded(config, pool.clone());

        let first = current_id(&session);
        session.answer(first, opt(0), fixed_now()).unwrap();
        assert!(session.quota_reached());
        let other = pool.into_iter().find(|q| q.id != first);
        assert!(session.advance_with(other, fixed_now()).is_complete());
    }

    #[test]
    fn adaptive_progress_counts_served_questions() {
        let config = QuizConfig::default().with_mode(SelectionMode::Adaptive);
        let pool: Vec<_> = (1..=3).map(|id| build_question(id, "signs", 0)).collect();
        let mut session = loaded(config, pool.clone());

        let first = current_id(&session);
        session.answer(first, opt(0), fixed_now()).unwrap();
        let next = pool.into_iter().find(|q| q.id != first);
        session.advance_with(next, fixed_now());

        let progress = session.progress();
        assert_eq!(progress.position, 2);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining(), 2);
    }

    #[test]
    fn reset_discards_state_and_renews_id() {
        let mut session = loaded(QuizConfig::default(), vec![build_question(1, "signs", 0)]);
        let id = current_id(&session);
        session.answer(id, opt(0), fixed_now()).unwrap();
        let old_id = session.id();

        session.reset();
        assert_ne!(session.id(), old_id);
        assert_eq!(session.phase(), &QuizPhase::Loading);
        assert_eq!(session.running_stats().answered(), 0);
        assert!(session.answered_ids().is_empty());
        assert!(session.current_question().is_none());
    }

    #[test]
    fn localized_view_uses_session_language() {
        let config = QuizConfig::default().with_language(Language::Persian);
        let session = loaded(config, vec![build_question(1, "signs", 0)]);
        let view = session.localized_current().unwrap();
        assert_eq!(view.prompt, "Q fa");
        assert_eq!(view.options[3], "D fa");
    }
}
