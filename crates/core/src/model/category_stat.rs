use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::Category;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CategoryStatError {
    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },
}

/// Durable per-category counters, incremented once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCategoryStat")]
pub struct CategoryStat {
    category: Category,
    total_questions: u32,
    correct_answers: u32,
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawCategoryStat {
    category: Category,
    total_questions: u32,
    correct_answers: u32,
    last_updated: DateTime<Utc>,
}

impl TryFrom<RawCategoryStat> for CategoryStat {
    type Error = CategoryStatError;

    fn try_from(raw: RawCategoryStat) -> Result<Self, Self::Error> {
        Self::from_persisted(
            raw.category,
            raw.total_questions,
            raw.correct_answers,
            raw.last_updated,
        )
    }
}

impl CategoryStat {
    /// Row created lazily by the first attempt in a category.
    #[must_use]
    pub fn first_attempt(category: Category, correct: bool, at: DateTime<Utc>) -> Self {
        Self {
            category,
            total_questions: 1,
            correct_answers: u32::from(correct),
            last_updated: at,
        }
    }

    /// Rehydrate counters from storage.
    ///
    /// # Errors
    ///
    /// Returns `CategoryStatError::CorrectExceedsTotal` if the row violates
    /// `correct <= total`.
    pub fn from_persisted(
        category: Category,
        total_questions: u32,
        correct_answers: u32,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, CategoryStatError> {
        if correct_answers > total_questions {
            return Err(CategoryStatError::CorrectExceedsTotal {
                correct: correct_answers,
                total: total_questions,
            });
        }
        Ok(Self {
            category,
            total_questions,
            correct_answers,
            last_updated,
        })
    }

    /// Count one more attempt.
    pub fn record(&mut self, correct: bool, at: DateTime<Utc>) {
        self.total_questions = self.total_questions.saturating_add(1);
        if correct {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        self.last_updated = at;
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        &self.category
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Success rate as a whole percentage, 0 when nothing was answered.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        rounded_percentage(self.correct_answers, self.total_questions)
    }

    #[must_use]
    pub fn level(&self) -> PerformanceLevel {
        PerformanceLevel::from_percentage(self.percentage())
    }
}

/// Coarse grade shown next to each category on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    NeedsWork,
}

impl PerformanceLevel {
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            Self::Excellent
        } else if percentage >= 60 {
            Self::Good
        } else {
            Self::NeedsWork
        }
    }
}

/// Totals across every category row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_questions: u64,
    pub total_correct: u64,
    pub overall_percentage: u32,
}

impl OverallStats {
    #[must_use]
    pub fn from_stats(stats: &[CategoryStat]) -> Self {
        let total_questions: u64 = stats.iter().map(|s| u64::from(s.total_questions)).sum();
        let total_correct: u64 = stats.iter().map(|s| u64::from(s.correct_answers)).sum();
        Self {
            total_questions,
            total_correct,
            overall_percentage: rounded_percentage_u64(total_correct, total_questions),
        }
    }
}

/// `round(correct / total * 100)`, half away from zero, 0 for an empty total.
#[must_use]
pub fn rounded_percentage(correct: u32, total: u32) -> u32 {
    rounded_percentage_u64(u64::from(correct), u64::from(total))
}

fn rounded_percentage_u64(correct: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (correct.saturating_mul(200) + total) / (total * 2);
    u32::try_from(pct).unwrap_or(u32::MAX)
}
