//! Daily calorie aggregation

use chrono::{DateTime, Utc};

use super::day_window::in_window;
use calorie_types::{BudgetStatus, CalorieSnapshot, FoodEntry};

/// Today's totals against the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub window_start: DateTime<Utc>,
    pub target: i64,
    pub consumed: i64,
    /// May be negative once the target is exceeded
    pub remaining: i64,
    pub status: BudgetStatus,
    /// Newest first
    pub entries: Vec<FoodEntry>,
}

impl DailySummary {
    /// Build a summary; entries older than `window_start` are dropped
    pub fn new(window_start: DateTime<Utc>, target: i64, entries: Vec<FoodEntry>) -> Self {
        let mut entries = entries_in_window(entries, window_start);
        sort_newest_first(&mut entries);
        let consumed = consumed_calories(&entries);
        let remaining = remaining_calories(target, consumed);
        Self {
            window_start,
            target,
            consumed,
            remaining,
            status: BudgetStatus::from_remaining(remaining),
            entries,
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> CalorieSnapshot {
        CalorieSnapshot {
            remaining_calories: self.remaining,
            total_calories: self.target,
            consumed_calories: self.consumed,
            last_updated: now,
        }
    }
}

/// Sum of `calories_per_serving * servings`
pub fn consumed_calories(entries: &[FoodEntry]) -> i64 {
    entries.iter().map(FoodEntry::total_calories).sum()
}

/// `target - consumed`, unclamped
pub fn remaining_calories(target: i64, consumed: i64) -> i64 {
    target - consumed
}

/// Keep only entries at or after `window_start`
pub fn entries_in_window(entries: Vec<FoodEntry>, window_start: DateTime<Utc>) -> Vec<FoodEntry> {
    entries
        .into_iter()
        .filter(|e| in_window(&e.timestamp, &window_start))
        .collect()
}

pub fn sort_newest_first(entries: &mut [FoodEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Servings after applying `delta`, floored at 1
pub fn adjusted_servings(current: u32, delta: i64) -> u32 {
    let next = i64::from(current).saturating_add(delta).max(1);
    u32::try_from(next).unwrap_or(u32::MAX)
}
