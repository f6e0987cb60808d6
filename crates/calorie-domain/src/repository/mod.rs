//! Repository and collaborator trait definitions

use chrono::{DateTime, Utc};
use uuid::Uuid;

use calorie_types::{CalorieSnapshot, FoodEntry, StoreError, UserSettings};

/// Record store for logged food entries
pub trait EntryRepository: Send + Sync {
    /// Insert a new entry and commit
    fn insert(&self, entry: &FoodEntry) -> Result<(), StoreError>;

    /// Replace an existing entry in place and commit.
    /// Returns false when no entry has that id.
    fn update(&self, entry: &FoodEntry) -> Result<bool, StoreError>;

    /// Remove an entry and commit. Returns false when the id is absent.
    fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Find an entry by id
    fn find_by_id(&self, id: Uuid) -> Result<Option<FoodEntry>, StoreError>;

    /// Entries with `timestamp >= start`, newest first
    fn find_since(&self, start: DateTime<Utc>) -> Result<Vec<FoodEntry>, StoreError>;
}

/// Record store for the singleton settings record
pub trait SettingsRepository: Send + Sync {
    /// Load the settings record, `None` if it was never written
    fn load(&self) -> Result<Option<UserSettings>, StoreError>;

    /// Overwrite the settings record and commit
    fn save(&self, settings: &UserSettings) -> Result<(), StoreError>;
}

/// Key-value channel visible to the display process
pub trait SharedStateChannel: Send + Sync {
    fn write(&self, snapshot: &CalorieSnapshot) -> Result<(), StoreError>;

    /// Last published snapshot, `None` if absent or undecodable
    fn read(&self) -> Option<CalorieSnapshot>;
}

/// Signal to the display surface that the shared snapshot changed
pub trait DisplayRefresher: Send + Sync {
    fn request_refresh(&self);
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
