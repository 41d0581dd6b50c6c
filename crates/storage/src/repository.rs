use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Attempt, AttemptId, Category, CategoryStat, NewAttempt, Question, QuestionId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote store answered {status}: {body}")]
    Remote { status: u16, body: String },
}

/// An attempt joined with the category of the question it answered.
///
/// `category` is `None` when the question has since been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentAttempt {
    pub attempt: Attempt,
    pub category: Option<Category>,
}

/// Read side of the question bank plus the aggregated category counters.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// All questions with the active flag set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn fetch_all_active(&self) -> Result<Vec<Question>, StorageError>;

    /// Active questions tagged with `category`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn fetch_by_category(&self, category: &Category) -> Result<Vec<Question>, StorageError>;

    /// Every category counter row, in the order the backend created them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn fetch_category_stats(&self) -> Result<Vec<CategoryStat>, StorageError>;

    /// Fetch a single question regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn fetch_by_id(&self, id: QuestionId) -> Result<Question, StorageError>;

    /// Up to `limit` active questions, optionally restricted to one category,
    /// skipping every id in `exclude`.
    ///
    /// Backends that can filter server-side should override this.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn fetch_candidates(
        &self,
        category: Option<&Category>,
        exclude: &[QuestionId],
        limit: usize,
    ) -> Result<Vec<Question>, StorageError> {
        let pool = match category {
            Some(category) => self.fetch_by_category(category).await?,
            None => self.fetch_all_active().await?,
        };
        Ok(pool
            .into_iter()
            .filter(|q| q.active && !exclude.contains(&q.id))
            .take(limit)
            .collect())
    }

    /// Insert or replace a question. Used by seeding and administration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;
}

/// Append-only sink for quiz attempts and the per-category counters.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Append one attempt and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn record_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, StorageError>;

    /// Count one attempt in `category`, creating the row on first use.
    ///
    /// Implementations increment at the store so concurrent sessions do not
    /// lose updates.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the counter cannot be updated.
    async fn increment_category_stat(
        &self,
        category: &Category,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Most recent attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn recent_attempts(&self, limit: u32) -> Result<Vec<RecentAttempt>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    attempts: Arc<Mutex<Vec<Attempt>>>,
    category_stats: Arc<Mutex<Vec<CategoryStat>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-filled with questions.
    #[must_use]
    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.questions.lock() {
            guard.extend(questions.into_iter().map(|q| (q.id, q)));
        }
        repo
    }

    /// Every stored attempt, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl QuestionStore for InMemoryRepository {
    async fn fetch_all_active(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().filter(|q| q.active).cloned().collect())
    }

    async fn fetch_by_category(&self, category: &Category) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|q| q.active && &q.category == category)
            .cloned()
            .collect())
    }

    async fn fetch_category_stats(&self) -> Result<Vec<CategoryStat>, StorageError> {
        let guard = self
            .category_stats
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn fetch_by_id(&self, id: QuestionId) -> Result<Question, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(question.id, question.clone());
        Ok(())
    }
}

#[async_trait]
impl ResultSink for InMemoryRepository {
    async fn record_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let next = u64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?
            + 1;
        let stored = attempt.clone().with_id(AttemptId::new(next));
        guard.push(stored.clone());
        Ok(stored)
    }

    async fn increment_category_stat(
        &self,
        category: &Category,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .category_stats
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.iter_mut().find(|s| s.category() == category) {
            Some(stat) => stat.record(correct, at),
            None => guard.push(CategoryStat::first_attempt(category.clone(), correct, at)),
        }
        Ok(())
    }

    async fn recent_attempts(&self, limit: u32) -> Result<Vec<RecentAttempt>, StorageError> {
        let attempts = self.attempts()?;
        let questions = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(attempts
            .into_iter()
            .rev()
            .take(limit)
            .map(|attempt| RecentAttempt {
                category: questions.get(&attempt.question_id).map(|q| q.category.clone()),
                attempt,
            })
            .collect())
    }
}

/// Aggregates the question store and result sink behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionStore>,
    pub results: Arc<dyn ResultSink>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionStore> = Arc::new(repo.clone());
        let results: Arc<dyn ResultSink> = Arc::new(repo);
        Self { questions, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{OptionIndex, QuestionDraft, SessionId, TextDraft};
    use quiz_core::time::fixed_now;

    fn build_question(id: u64, category: &str, active: bool) -> Question {
        let t = |s: &str| TextDraft {
            he: s.into(),
            fa: s.into(),
        };
        QuestionDraft {
            id: None,
            category: category.into(),
            prompt: t("Q"),
            options: [t("A"), t("B"), t("C"), t("D")],
            correct_option: 0,
            explanation: t("E"),
            active,
        }
        .validate()
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    #[tokio::test]
    async fn fetches_only_active_questions() {
        let repo = InMemoryRepository::with_questions([
            build_question(1, "signs", true),
            build_question(2, "signs", false),
            build_question(3, "math", true),
        ]);

        let active = repo.fetch_all_active().await.unwrap();
        assert_eq!(active.len(), 2);

        let signs = Category::new("signs").unwrap();
        let by_category = repo.fetch_by_category(&signs).await.unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].id, QuestionId::new(1));

        // inactive questions are still reachable by id
        assert!(!repo.fetch_by_id(QuestionId::new(2)).await.unwrap().active);
        assert_eq!(
            repo.fetch_by_id(QuestionId::new(99)).await.unwrap_err(),
            StorageError::NotFound
        );
    }

    #[tokio::test]
    async fn default_candidates_respect_exclusions_and_limit() {
        let repo = InMemoryRepository::with_questions(
            (1..=5).map(|id| build_question(id, "signs", true)),
        );
        let signs = Category::new("signs").unwrap();

        let picked = repo
            .fetch_candidates(Some(&signs), &[QuestionId::new(1), QuestionId::new(2)], 2)
            .await
            .unwrap();
        let ids: Vec<_> = picked.iter().map(|q| q.id.value()).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn increments_create_then_count() {
        let repo = InMemoryRepository::new();
        let signs = Category::new("signs").unwrap();
        let math = Category::new("math").unwrap();

        repo.increment_category_stat(&signs, true, fixed_now()).await.unwrap();
        repo.increment_category_stat(&math, false, fixed_now()).await.unwrap();
        repo.increment_category_stat(&signs, false, fixed_now()).await.unwrap();

        let stats = repo.fetch_category_stats().await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].category(), &signs);
        assert_eq!(stats[0].total_questions(), 2);
        assert_eq!(stats[0].correct_answers(), 1);
        assert_eq!(stats[1].total_questions(), 1);
        assert_eq!(stats[1].correct_answers(), 0);
    }

    #[tokio::test]
    async fn recent_attempts_are_newest_first_with_category() {
        let repo = InMemoryRepository::with_questions([build_question(1, "signs", true)]);
        let session = SessionId::generate();
        let question = repo.fetch_by_id(QuestionId::new(1)).await.unwrap();

        for selected in [0, 1] {
            let attempt = NewAttempt::for_question(
                session,
                &question,
                OptionIndex::new(selected).unwrap(),
                Some(500),
                fixed_now(),
            );
            repo.record_attempt(&attempt).await.unwrap();
        }

        let recent = repo.recent_attempts(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].attempt.id, AttemptId::new(2));
        assert!(!recent[0].attempt.is_correct);
        assert_eq!(recent[0].category.as_ref().map(Category::as_str), Some("signs"));
        assert_eq!(repo.recent_attempts(1).await.unwrap().len(), 1);
    }
}
