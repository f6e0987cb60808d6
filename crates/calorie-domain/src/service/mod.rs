//! Domain services

pub mod aggregation;
pub mod day_window;

pub use aggregation::{
    adjusted_servings, consumed_calories, entries_in_window, remaining_calories, DailySummary,
};
pub use day_window::{day_window_start, in_window, MAX_RESET_HOUR};
