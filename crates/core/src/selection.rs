//! Pure building blocks of question selection.
//!
//! Nothing here touches storage: callers fetch fresh rows and pass them in,
//! so every decision reflects the latest persisted attempts.

use rand::Rng;
use std::cmp::Ordering;

use crate::model::{Category, CategoryStat};

/// Shuffles in place with a uniform Fisher–Yates permutation.
///
/// Walks `i` from the last index down to 1 and swaps with an index drawn
/// uniformly from `0..=i`.
pub fn fisher_yates_shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Picks one element uniformly, or `None` for an empty slice.
pub fn pick_uniform<'a, T, R: Rng>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.random_range(0..items.len()))
}

/// Compares two `correct/total` ratios without floating point.
///
/// Both totals must be non-zero.
fn compare_ratio(a: &CategoryStat, b: &CategoryStat) -> Ordering {
    let lhs = u64::from(a.correct_answers()) * u64::from(b.total_questions());
    let rhs = u64::from(b.correct_answers()) * u64::from(a.total_questions());
    lhs.cmp(&rhs)
}

/// The category with the lowest success ratio among rows with attempts.
///
/// Rows with `total == 0` are never chosen. Ties keep the first row in input
/// order. Returns `None` when no row has any attempts.
#[must_use]
pub fn weakest_category(stats: &[CategoryStat]) -> Option<&Category> {
    let mut weakest: Option<&CategoryStat> = None;
    for row in stats.iter().filter(|s| s.total_questions() > 0) {
        weakest = match weakest {
            Some(current) if compare_ratio(row, current) != Ordering::Less => Some(current),
            _ => Some(row),
        };
    }
    weakest.map(CategoryStat::category)
}
