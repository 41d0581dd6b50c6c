use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{Category, SessionId, SessionRunningStats};

/// Per-category line of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub correct: u32,
    pub total: u32,
    /// Rounded percentage.
    pub rate: u32,
}

/// End-of-quiz summary built from the session's running statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizReport {
    pub session_id: SessionId,
    pub answered: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub success_rate: u32,
    pub categories: Vec<CategoryBreakdown>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuizReport {
    pub(crate) fn from_running(
        session_id: SessionId,
        stats: &SessionRunningStats,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let categories = stats
            .by_category()
            .iter()
            .map(|(category, tally)| CategoryBreakdown {
                category: category.clone(),
                correct: tally.correct,
                total: tally.total,
                rate: tally.percentage(),
            })
            .collect();

        Self {
            session_id,
            answered: stats.answered(),
            correct: stats.correct(),
            incorrect: stats.incorrect(),
            success_rate: stats.success_rate(),
            categories,
            started_at,
            completed_at,
        }
    }
}
