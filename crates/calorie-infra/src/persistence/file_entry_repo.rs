//! File-based food entry repository
//!
//! All entries live in one `entries.json` under the store directory. The
//! whole collection is kept in memory and rewritten on every commit; a
//! single user logs a handful of meals a day, so the file stays small.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use calorie_domain::repository::EntryRepository;
use calorie_types::{FoodEntry, StoreError};

use super::json_file::{load_json, save_json};

const ENTRIES_FILE: &str = "entries.json";

/// On-disk shape of an entry; photo bytes are stored as base64
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: Uuid,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    description: String,
    calories_per_serving: u32,
    #[serde(default = "one")]
    servings: u32,
}

fn one() -> u32 {
    1
}

impl From<&FoodEntry> for StoredEntry {
    fn from(entry: &FoodEntry) -> Self {
        Self {
            id: entry.id,
            timestamp: entry.timestamp,
            image_base64: entry
                .image_data
                .as_ref()
                .map(|bytes| BASE64_STANDARD.encode(bytes)),
            description: entry.description.clone(),
            calories_per_serving: entry.calories_per_serving,
            servings: entry.servings,
        }
    }
}

impl TryFrom<StoredEntry> for FoodEntry {
    type Error = StoreError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        let image_data = stored
            .image_base64
            .map(|b64| BASE64_STANDARD.decode(b64))
            .transpose()
            .map_err(|e| StoreError::Corrupted(format!("entry {} image: {}", stored.id, e)))?;

        Ok(FoodEntry {
            id: stored.id,
            timestamp: stored.timestamp,
            image_data,
            description: stored.description,
            calories_per_serving: stored.calories_per_serving,
            servings: stored.servings.max(1),
        })
    }
}

/// JSON-file implementation of [`EntryRepository`]
pub struct FileEntryRepository {
    store_path: PathBuf,
    entries: RwLock<HashMap<Uuid, FoodEntry>>,
}

impl FileEntryRepository {
    /// Create or load the entry store in `store_dir`
    pub fn open(store_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store_dir = store_dir.as_ref();
        std::fs::create_dir_all(store_dir)?;
        let store_path = store_dir.join(ENTRIES_FILE);

        let stored: Vec<StoredEntry> = load_json(&store_path)?.unwrap_or_default();
        let entries = stored
            .into_iter()
            .map(|s| FoodEntry::try_from(s).map(|e| (e.id, e)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        tracing::debug!(path = %store_path.display(), count = entries.len(), "entry store opened");
        Ok(Self {
            store_path,
            entries: RwLock::new(entries),
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, FoodEntry>>, StoreError> {
        self.entries
            .read()
            .map_err(|_| StoreError::Corrupted("entry store lock poisoned".into()))
    }

    /// Apply `change` to a copy, persist it, then swap it in.
    /// A failed write leaves the in-memory view untouched.
    fn commit<R>(
        &self,
        change: impl FnOnce(&mut HashMap<Uuid, FoodEntry>) -> R,
    ) -> Result<R, StoreError> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| StoreError::Corrupted("entry store lock poisoned".into()))?;

        let mut next = guard.clone();
        let result = change(&mut next);

        let mut stored: Vec<StoredEntry> = next.values().map(StoredEntry::from).collect();
        stored.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        save_json(&self.store_path, &stored)?;

        *guard = next;
        Ok(result)
    }
}

impl EntryRepository for FileEntryRepository {
    fn insert(&self, entry: &FoodEntry) -> Result<(), StoreError> {
        self.commit(|entries| {
            entries.insert(entry.id, entry.clone());
        })
    }

    fn update(&self, entry: &FoodEntry) -> Result<bool, StoreError> {
        if !self.read()?.contains_key(&entry.id) {
            return Ok(false);
        }
        self.commit(|entries| entries.insert(entry.id, entry.clone()).is_some())
    }

    fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        if !self.read()?.contains_key(&id) {
            return Ok(false);
        }
        self.commit(|entries| entries.remove(&id).is_some())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<FoodEntry>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    fn find_since(&self, start: DateTime<Utc>) -> Result<Vec<FoodEntry>, StoreError> {
        let mut found: Vec<FoodEntry> = self
            .read()?
            .values()
            .filter(|e| e.timestamp >= start)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }
}
