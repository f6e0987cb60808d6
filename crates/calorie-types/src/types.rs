//! Core types for calorie tracking

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default daily calorie target
pub const DEFAULT_DAILY_TARGET: i64 = 2000;

/// Remaining calories below which the day is flagged as running low
pub const LOW_REMAINING_THRESHOLD: i64 = 300;

/// Remote multimodal AI backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Provider {
    /// OpenAI chat completions (gpt-4o)
    #[default]
    #[serde(rename = "OpenAI")]
    #[value(name = "openai")]
    OpenAi,
    /// Anthropic messages API
    #[serde(rename = "Claude")]
    #[value(name = "claude")]
    Claude,
}

impl Provider {
    pub fn label(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Claude => "Claude",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One logged food item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: Uuid,

    /// Creation instant
    pub timestamp: DateTime<Utc>,

    /// Raw photo bytes, absent once stripped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<u8>>,

    pub description: String,

    /// Base estimate for one serving
    pub calories_per_serving: u32,

    /// Serving multiplier, never below 1
    pub servings: u32,
}

impl FoodEntry {
    /// Create an entry with one serving, stamped `timestamp`
    pub fn new(
        image_data: Option<Vec<u8>>,
        description: impl Into<String>,
        calories_per_serving: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            image_data,
            description: description.into(),
            calories_per_serving,
            servings: 1,
        }
    }

    pub fn total_calories(&self) -> i64 {
        i64::from(self.calories_per_serving) * i64::from(self.servings)
    }

    pub fn has_image(&self) -> bool {
        self.image_data.as_ref().is_some_and(|data| !data.is_empty())
    }
}

/// Per-installation user settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default = "default_daily_target")]
    pub daily_calorie_target: i64,

    /// Hour (0-23) at which the day rolls over
    #[serde(default)]
    pub day_reset_hour: u32,

    #[serde(default)]
    pub provider: Provider,

    #[serde(default)]
    pub api_key: String,
}

fn default_daily_target() -> i64 {
    DEFAULT_DAILY_TARGET
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            daily_calorie_target: DEFAULT_DAILY_TARGET,
            day_reset_hour: 0,
            provider: Provider::default(),
            api_key: String::new(),
        }
    }
}

impl UserSettings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Partial settings update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub daily_calorie_target: Option<i64>,
    pub day_reset_hour: Option<u32>,
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: i64) -> Self {
        self.daily_calorie_target = Some(target);
        self
    }

    pub fn with_reset_hour(mut self, hour: u32) -> Self {
        self.day_reset_hour = Some(hour);
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Display snapshot published for the widget process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalorieSnapshot {
    pub remaining_calories: i64,
    pub total_calories: i64,
    pub consumed_calories: i64,
    pub last_updated: DateTime<Utc>,
}

/// Result of analyzing one food photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodAnalysis {
    pub description: String,
    pub calories_per_serving: u32,
}

/// How the day stands against the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// More than the low threshold left
    OnTrack,
    /// Under the low threshold but not over
    Low,
    /// Target exceeded
    Over,
}

impl BudgetStatus {
    pub fn from_remaining(remaining: i64) -> Self {
        if remaining < 0 {
            BudgetStatus::Over
        } else if remaining < LOW_REMAINING_THRESHOLD {
            BudgetStatus::Low
        } else {
            BudgetStatus::OnTrack
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BudgetStatus::OnTrack => "on track",
            BudgetStatus::Low => "running low",
            BudgetStatus::Over => "over target",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_calories_scales_with_servings() {
        let mut entry = FoodEntry::new(None, "Pizza", 500, Utc::now());
        assert_eq!(entry.servings, 1);
        assert_eq!(entry.total_calories(), 500);
        entry.servings = 3;
        assert_eq!(entry.total_calories(), 1500);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = UserSettings::default();
        assert_eq!(settings.daily_calorie_target, 2000);
        assert_eq!(settings.day_reset_hour, 0);
        assert_eq!(settings.provider, Provider::OpenAi);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: UserSettings = serde_json::from_str(r#"{"provider":"Claude"}"#).unwrap();
        assert_eq!(settings.daily_calorie_target, 2000);
        assert_eq!(settings.provider, Provider::Claude);
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let snapshot = CalorieSnapshot {
            remaining_calories: -150,
            total_calories: 2000,
            consumed_calories: 2150,
            last_updated: Utc::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["remainingCalories"], -150);
        assert_eq!(json["totalCalories"], 2000);
        assert_eq!(json["consumedCalories"], 2150);
        assert!(json.get("lastUpdated").is_some());
    }

    #[test]
    fn test_budget_status_bands() {
        assert_eq!(BudgetStatus::from_remaining(-1), BudgetStatus::Over);
        assert_eq!(BudgetStatus::from_remaining(0), BudgetStatus::Low);
        assert_eq!(BudgetStatus::from_remaining(299), BudgetStatus::Low);
        assert_eq!(BudgetStatus::from_remaining(300), BudgetStatus::OnTrack);
    }

    #[test]
    fn test_stripped_image_is_not_an_image() {
        let mut entry = FoodEntry::new(Some(vec![0xff, 0xd8]), "Toast", 120, Utc::now());
        assert!(entry.has_image());
        entry.image_data = None;
        assert!(!entry.has_image());
    }
}
