use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::category_stat::rounded_percentage;
use crate::model::question::Category;

/// Correct/total pair for one category within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryTally {
    pub correct: u32,
    pub total: u32,
}

impl CategoryTally {
    #[must_use]
    pub fn percentage(&self) -> u32 {
        rounded_percentage(self.correct, self.total)
    }
}

/// In-memory score for one quiz run.
///
/// `correct + incorrect` always equals the number of accepted answers; the
/// per-category tallies sum to the same figure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionRunningStats {
    correct: u32,
    incorrect: u32,
    by_category: BTreeMap<Category, CategoryTally>,
}

impl SessionRunningStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: &Category, correct: bool) {
        if correct {
            self.correct = self.correct.saturating_add(1);
        } else {
            self.incorrect = self.incorrect.saturating_add(1);
        }
        let tally = self.by_category.entry(category.clone()).or_default();
        tally.total = tally.total.saturating_add(1);
        if correct {
            tally.correct = tally.correct.saturating_add(1);
        }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    /// Whole-percentage success rate, 0 before the first answer.
    #[must_use]
    pub fn success_rate(&self) -> u32 {
        rounded_percentage(self.correct, self.answered())
    }

    #[must_use]
    pub fn by_category(&self) -> &BTreeMap<Category, CategoryTally> {
        &self.by_category
    }

    #[must_use]
    pub fn category(&self, category: &Category) -> Option<CategoryTally> {
        self.by_category.get(category).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_stay_consistent() {
        let signs = Category::new("signs").unwrap();
        let math = Category::new("math").unwrap();
        let mut stats = SessionRunningStats::new();
        assert_eq!(stats.success_rate(), 0);

        stats.record(&signs, true);
        stats.record(&signs, false);
        stats.record(&math, true);

        assert_eq!(stats.correct(), 2);
        assert_eq!(stats.incorrect(), 1);
        assert_eq!(stats.answered(), 3);
        assert_eq!(stats.success_rate(), 67);
        assert_eq!(stats.category(&signs), Some(CategoryTally { correct: 1, total: 2 }));
        assert_eq!(stats.category(&math).map(|t| t.percentage()), Some(100));

        let summed: u32 = stats.by_category().values().map(|t| t.total).sum();
        assert_eq!(summed, stats.answered());
    }
}
