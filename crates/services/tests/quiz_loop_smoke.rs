use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Attempt, Category, CategoryStat, NewAttempt, OptionIndex, Question, QuestionDraft, QuestionId,
    TextDraft,
};
use quiz_core::time::{fixed_clock, fixed_now};
use services::{
    LoadError, PersistenceError, QuizConfig, QuizLoopService, QuizPhase, QuizSession,
    SelectionMode, StatsService,
};
use storage::repository::{
    InMemoryRepository, QuestionStore, RecentAttempt, ResultSink, StorageError,
};

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

fn service(repo: &InMemoryRepository, config: QuizConfig) -> QuizLoopService {
    QuizLoopService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        config,
    )
    .with_rng_seed(42)
}

fn current_id(session: &QuizSession) -> QuestionId {
    session.current_question().unwrap().id
}

/// Answers with `pick` until the session completes; returns the number of answers.
async fn play(svc: &QuizLoopService, session: &mut QuizSession, pick: impl Fn(&Question) -> u8) -> usize {
    let mut answered = 0;
    while !session.phase().is_complete() {
        let question = svc.present(session).unwrap().clone();
        svc.answer(session, question.id, opt(pick(&question)))
            .await
            .unwrap();
        answered += 1;
        svc.advance(session).await.unwrap();
    }
    answered
}

//
// ─── TEST DOUBLES ──────────────────────────────────────────────────────────────
//

struct DownStore;

#[async_trait]
impl QuestionStore for DownStore {
    async fn fetch_all_active(&self) -> Result<Vec<Question>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn fetch_by_category(&self, _category: &Category) -> Result<Vec<Question>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn fetch_category_stats(&self) -> Result<Vec<CategoryStat>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn fetch_by_id(&self, _id: QuestionId) -> Result<Question, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn upsert_question(&self, _question: &Question) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

struct DownSink;

#[async_trait]
impl ResultSink for DownSink {
    async fn record_attempt(&self, _attempt: &NewAttempt) -> Result<Attempt, StorageError> {
        Err(StorageError::Remote {
            status: 503,
            body: "unavailable".into(),
        })
    }

    async fn increment_category_stat(
        &self,
        _category: &Category,
        _correct: bool,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn recent_attempts(&self, _limit: u32) -> Result<Vec<RecentAttempt>, StorageError> {
        Ok(Vec::new())
    }
}

/// Delegates to an in-memory repository after a long pause.
struct SlowStore(InMemoryRepository);

#[async_trait]
impl QuestionStore for SlowStore {
    async fn fetch_all_active(&self) -> Result<Vec<Question>, StorageError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        self.0.fetch_all_active().await
    }

    async fn fetch_by_category(&self, category: &Category) -> Result<Vec<Question>, StorageError> {
        self.0.fetch_by_category(category).await
    }

    async fn fetch_category_stats(&self) -> Result<Vec<CategoryStat>, StorageError> {
        self.0.fetch_category_stats().await
    }

    async fn fetch_by_id(&self, id: QuestionId) -> Result<Question, StorageError> {
        self.0.fetch_by_id(id).await
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        self.0.upsert_question(question).await
    }
}

//
// ─── SCENARIOS ─────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn two_questions_one_right_one_wrong() {
    let repo = InMemoryRepository::with_questions([
        build_question(1, "signs", 1),
        build_question(2, "rules", 0),
    ]);
    let svc = service(&repo, QuizConfig::default());
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();

    let answered = play(&svc, &mut session, |_| 1).await;
    assert_eq!(answered, 2);

    let report = session.report();
    assert_eq!((report.correct, report.incorrect), (1, 1));
    assert_eq!(report.success_rate, 50);
    assert_eq!(session.phase(), &QuizPhase::Complete);

    let attempts = repo.attempts().unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.session_id == session.id()));
}

#[tokio::test]
async fn max_questions_caps_a_deterministic_run() {
    let repo = InMemoryRepository::with_questions((1..=5).map(|id| build_question(id, "signs", 0)));
    let svc = service(&repo, QuizConfig::default().with_max_questions(1));
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();

    assert_eq!(play(&svc, &mut session, |_| 0).await, 1);
    assert_eq!(repo.attempts().unwrap().len(), 1);
}

#[tokio::test]
async fn double_answer_writes_one_attempt() {
    let repo = InMemoryRepository::with_questions([build_question(1, "signs", 2)]);
    let svc = service(&repo, QuizConfig::default());
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();
    svc.present(&mut session);

    let id = current_id(&session);
    assert!(svc.answer(&mut session, id, opt(2)).await.is_some());
    assert!(svc.answer(&mut session, id, opt(0)).await.is_none());

    assert_eq!(session.running_stats().correct(), 1);
    assert_eq!(session.running_stats().incorrect(), 0);
    assert_eq!(repo.attempts().unwrap().len(), 1);
    let stats = repo.fetch_category_stats().await.unwrap();
    assert_eq!(stats[0].total_questions(), 1);
}

#[tokio::test]
async fn advance_after_complete_stays_complete() {
    let repo = InMemoryRepository::with_questions([build_question(1, "signs", 0)]);
    let svc = service(&repo, QuizConfig::default());
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();
    play(&svc, &mut session, |_| 0).await;

    svc.advance(&mut session).await.unwrap();
    svc.advance(&mut session).await.unwrap();
    assert_eq!(session.phase(), &QuizPhase::Complete);
    assert_eq!(session.running_stats().answered(), 1);
}

#[tokio::test]
async fn category_stats_track_every_accepted_answer() {
    let repo = InMemoryRepository::with_questions(
        (1..=6).map(|id| build_question(id, if id <= 4 { "signs" } else { "rules" }, 0)),
    );
    let svc = service(&repo, QuizConfig::default().with_max_questions(0));
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();

    // correct on even ids only
    play(&svc, &mut session, |q| if q.id.value() % 2 == 0 { 0 } else { 1 }).await;

    let stats = repo.fetch_category_stats().await.unwrap();
    let signs = stats.iter().find(|s| s.category().as_str() == "signs").unwrap();
    let rules = stats.iter().find(|s| s.category().as_str() == "rules").unwrap();
    assert_eq!((signs.total_questions(), signs.correct_answers()), (4, 2));
    assert_eq!((rules.total_questions(), rules.correct_answers()), (2, 1));

    let running = session.running_stats();
    assert_eq!(running.correct() + running.incorrect(), 6);
}

#[tokio::test]
async fn adaptive_run_targets_weakest_category_first() {
    let repo = InMemoryRepository::with_questions([
        build_question(1, "math", 0),
        build_question(2, "math", 0),
        build_question(3, "signs", 0),
        build_question(4, "signs", 0),
    ]);
    let math = Category::new("math").unwrap();
    let signs = Category::new("signs").unwrap();
    for i in 0..10 {
        repo.increment_category_stat(&math, i < 8, fixed_now()).await.unwrap();
        repo.increment_category_stat(&signs, i < 2, fixed_now()).await.unwrap();
    }

    let svc = service(&repo, QuizConfig::default().with_mode(SelectionMode::Adaptive));
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();

    // answer wrong so signs stays weakest
    let first = current_id(&session);
    svc.answer(&mut session, first, opt(3)).await.unwrap();
    svc.advance(&mut session).await.unwrap();

    let second = session.current_question().unwrap();
    assert_eq!(second.category, signs);
    assert_ne!(second.id, first);
}

#[tokio::test]
async fn adaptive_run_serves_each_question_once() {
    let repo = InMemoryRepository::with_questions(
        (1..=8).map(|id| build_question(id, if id % 3 == 0 { "math" } else { "signs" }, 0)),
    );
    let config = QuizConfig::default()
        .with_mode(SelectionMode::Adaptive)
        .with_max_questions(0);
    let svc = service(&repo, config);
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();

    let answered = play(&svc, &mut session, |q| if q.id.value() % 2 == 0 { 0 } else { 1 }).await;
    assert_eq!(answered, 8);

    let mut ids: Vec<_> = session.answered_ids().iter().map(|id| id.value()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn adaptive_run_stops_at_max_questions() {
    let repo = InMemoryRepository::with_questions((1..=8).map(|id| build_question(id, "signs", 0)));
    let config = QuizConfig::default()
        .with_mode(SelectionMode::Adaptive)
        .with_max_questions(3);
    let svc = service(&repo, config);
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();
    assert_eq!(session.progress().planned, 3);

    assert_eq!(play(&svc, &mut session, |_| 0).await, 3);
}

#[tokio::test]
async fn failing_store_surfaces_retryable_load_error() {
    let svc = QuizLoopService::new(
        fixed_clock(),
        Arc::new(DownStore),
        Arc::new(DownSink),
        QuizConfig::default(),
    );
    let mut session = svc.new_session();

    let err = svc.start(&mut session).await.unwrap_err();
    assert!(matches!(err, LoadError::Fetch(StorageError::Connection(_))));
    assert!(matches!(session.phase(), QuizPhase::Error(_)));
    assert!(session.phase().can_start());
}

#[tokio::test]
async fn empty_bank_is_a_load_error() {
    let repo = InMemoryRepository::new();
    let svc = service(&repo, QuizConfig::default());
    let mut session = svc.new_session();
    assert_eq!(svc.start(&mut session).await, Err(LoadError::Empty));

    // retry after questions appear
    repo.upsert_question(&build_question(1, "signs", 0)).await.unwrap();
    svc.start(&mut session).await.unwrap();
    assert_eq!(session.phase(), &QuizPhase::Ready);
}

#[tokio::test]
async fn failing_sink_keeps_local_stats() {
    let repo = InMemoryRepository::with_questions([build_question(1, "signs", 0)]);
    let svc = QuizLoopService::new(
        fixed_clock(),
        Arc::new(repo),
        Arc::new(DownSink),
        QuizConfig::default(),
    );
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();

    let id = current_id(&session);
    let answer = svc.answer(&mut session, id, opt(0)).await.unwrap();
    assert!(!answer.is_persisted());
    assert_eq!(answer.attempt_id, None);
    assert!(matches!(
        answer.persistence_errors.as_slice(),
        [PersistenceError::Attempt(_), PersistenceError::CategoryStat(_)]
    ));
    assert_eq!(session.running_stats().correct(), 1);

    svc.advance(&mut session).await.unwrap();
    assert_eq!(session.report().success_rate, 100);
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out() {
    let repo = InMemoryRepository::with_questions([build_question(1, "signs", 0)]);
    let svc = QuizLoopService::new(
        fixed_clock(),
        Arc::new(SlowStore(repo.clone())),
        Arc::new(repo),
        QuizConfig::default().with_store_timeout(Duration::from_secs(2)),
    );
    let mut session = svc.new_session();

    assert_eq!(svc.start(&mut session).await, Err(LoadError::Timeout));
    assert_eq!(session.phase(), &QuizPhase::Error(LoadError::Timeout));
}

#[tokio::test]
async fn reset_starts_a_new_session() {
    let repo = InMemoryRepository::with_questions([build_question(1, "signs", 0)]);
    let svc = service(&repo, QuizConfig::default());
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();
    play(&svc, &mut session, |_| 0).await;
    let first_id = session.id();

    svc.reset(&mut session).await.unwrap();
    assert_ne!(session.id(), first_id);
    assert_eq!(session.phase(), &QuizPhase::Ready);
    assert_eq!(session.running_stats().answered(), 0);
}

#[tokio::test]
async fn dashboard_reflects_a_finished_quiz() {
    let repo = InMemoryRepository::with_questions([
        build_question(1, "signs", 0),
        build_question(2, "signs", 1),
    ]);
    let svc = service(&repo, QuizConfig::default());
    let mut session = svc.new_session();
    svc.start(&mut session).await.unwrap();
    play(&svc, &mut session, |_| 0).await;

    let dashboard = StatsService::new(Arc::new(repo.clone()), Arc::new(repo))
        .dashboard()
        .await
        .unwrap();
    assert_eq!(dashboard.overall.total_questions, 2);
    assert_eq!(dashboard.overall.overall_percentage, 50);
    assert_eq!(dashboard.recent.len(), 2);
    assert!(dashboard.recent.iter().all(|r| r.category.is_some()));
}
