//! In-memory stores and collaborators
//!
//! Used by tests and by callers that want an ephemeral session. The
//! failure switches let tests exercise the error paths of the engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use calorie_domain::repository::{
    Clock, DisplayRefresher, EntryRepository, SettingsRepository, SharedStateChannel,
};
use calorie_types::{CalorieSnapshot, FoodEntry, StoreError, UserSettings};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_failure() -> StoreError {
    StoreError::Io(std::io::Error::other("simulated write failure"))
}

/// Entry store held in a map
#[derive(Debug, Default)]
pub struct InMemoryEntryRepository {
    entries: Mutex<HashMap<Uuid, FoodEntry>>,
    fail_writes: AtomicBool,
}

impl InMemoryEntryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(write_failure())
        } else {
            Ok(())
        }
    }
}

impl EntryRepository for InMemoryEntryRepository {
    fn insert(&self, entry: &FoodEntry) -> Result<(), StoreError> {
        self.check_writable()?;
        lock(&self.entries).insert(entry.id, entry.clone());
        Ok(())
    }

    fn update(&self, entry: &FoodEntry) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut entries = lock(&self.entries);
        match entries.get_mut(&entry.id) {
            Some(slot) => {
                *slot = entry.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(lock(&self.entries).remove(&id).is_some())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<FoodEntry>, StoreError> {
        Ok(lock(&self.entries).get(&id).cloned())
    }

    fn find_since(&self, start: DateTime<Utc>) -> Result<Vec<FoodEntry>, StoreError> {
        let mut found: Vec<FoodEntry> = lock(&self.entries)
            .values()
            .filter(|e| e.timestamp >= start)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }
}

/// Settings record held in memory
#[derive(Debug, Default)]
pub struct InMemorySettingsRepository {
    settings: Mutex<Option<UserSettings>>,
    saves: AtomicUsize,
    fail_loads: AtomicBool,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: UserSettings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
            ..Self::default()
        }
    }

    /// Make `load` report an unreadable record
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SettingsRepository for InMemorySettingsRepository {
    fn load(&self) -> Result<Option<UserSettings>, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupted("simulated unreadable settings".to_string()));
        }
        Ok(lock(&self.settings).clone())
    }

    fn save(&self, settings: &UserSettings) -> Result<(), StoreError> {
        *lock(&self.settings) = Some(settings.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Shared-state channel that keeps every published snapshot
#[derive(Debug, Default)]
pub struct InMemorySharedState {
    history: Mutex<Vec<CalorieSnapshot>>,
    fail_writes: AtomicBool,
}

impl InMemorySharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// All snapshots written so far, oldest first
    pub fn history(&self) -> Vec<CalorieSnapshot> {
        lock(&self.history).clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.history).len()
    }
}

impl SharedStateChannel for InMemorySharedState {
    fn write(&self, snapshot: &CalorieSnapshot) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(write_failure());
        }
        lock(&self.history).push(snapshot.clone());
        Ok(())
    }

    fn read(&self) -> Option<CalorieSnapshot> {
        lock(&self.history).last().cloned()
    }
}

/// Refresher that counts signals
#[derive(Debug, Default)]
pub struct RecordingRefresher {
    count: AtomicUsize,
}

impl RecordingRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl DisplayRefresher for RecordingRefresher {
    fn request_refresh(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.now) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_entry_repo_basic_ops() {
        let repo = InMemoryEntryRepository::new();
        let now = Utc::now();
        let old = FoodEntry::new(None, "old", 100, now - Duration::days(2));
        let new = FoodEntry::new(None, "new", 200, now);
        repo.insert(&old).unwrap();
        repo.insert(&new).unwrap();

        let recent = repo.find_since(now - Duration::hours(1)).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, new.id);

        assert!(repo.delete(old.id).unwrap());
        assert!(!repo.delete(old.id).unwrap());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_failing_writes() {
        let repo = InMemoryEntryRepository::new();
        repo.set_fail_writes(true);
        let entry = FoodEntry::new(None, "x", 1, Utc::now());
        assert!(matches!(repo.insert(&entry), Err(StoreError::Io(_))));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_shared_state_reads_latest() {
        let channel = InMemorySharedState::new();
        assert!(channel.read().is_none());
        for consumed in [100, 250] {
            channel
                .write(&CalorieSnapshot {
                    remaining_calories: 2000 - consumed,
                    total_calories: 2000,
                    consumed_calories: consumed,
                    last_updated: Utc::now(),
                })
                .unwrap();
        }
        assert_eq!(channel.write_count(), 2);
        assert_eq!(channel.read().unwrap().consumed_calories, 250);
    }
}
