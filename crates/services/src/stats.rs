//! Aggregated history for the statistics dashboard.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{Category, CategoryStat, OverallStats, PerformanceLevel};
use storage::repository::{QuestionStore, RecentAttempt, ResultSink, Storage};

use crate::config::DEFAULT_STORE_TIMEOUT;
use crate::deadline::within;
use crate::error::StatsError;

pub const DEFAULT_RECENT_LIMIT: u32 = 20;

/// One category row of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub percentage: u32,
    pub level: PerformanceLevel,
    pub last_updated: DateTime<Utc>,
}

impl From<&CategoryStat> for CategorySummary {
    fn from(stat: &CategoryStat) -> Self {
        Self {
            category: stat.category().clone(),
            total_questions: stat.total_questions(),
            correct_answers: stat.correct_answers(),
            percentage: stat.percentage(),
            level: stat.level(),
            last_updated: stat.last_updated(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsDashboard {
    pub overall: OverallStats,
    pub categories: Vec<CategorySummary>,
    /// Newest first.
    pub recent: Vec<RecentAttempt>,
}

#[derive(Clone)]
pub struct StatsService {
    questions: Arc<dyn QuestionStore>,
    results: Arc<dyn ResultSink>,
    timeout: Duration,
    recent_limit: u32,
}

impl StatsService {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionStore>, results: Arc<dyn ResultSink>) -> Self {
        Self {
            questions,
            results,
            timeout: DEFAULT_STORE_TIMEOUT,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(Arc::clone(&storage.questions), Arc::clone(&storage.results))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_recent_limit(mut self, recent_limit: u32) -> Self {
        self.recent_limit = recent_limit;
        self
    }

    /// Overall totals, per-category performance and the latest attempts.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` if either read fails or times out.
    pub async fn dashboard(&self) -> Result<StatsDashboard, StatsError> {
        let stats = within(self.timeout, self.questions.fetch_category_stats()).await?;
        let recent = within(self.timeout, self.results.recent_attempts(self.recent_limit)).await?;

        Ok(StatsDashboard {
            overall: OverallStats::from_stats(&stats),
            categories: stats.iter().map(CategorySummary::from).collect(),
            recent,
        })
    }
}
