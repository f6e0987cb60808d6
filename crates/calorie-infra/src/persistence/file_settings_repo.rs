//! File-based settings repository

use std::path::{Path, PathBuf};

use calorie_domain::repository::SettingsRepository;
use calorie_types::{StoreError, UserSettings};

use super::json_file::{load_json, save_json};

const SETTINGS_FILE: &str = "settings.json";

/// Stores the singleton [`UserSettings`] record in `settings.json`
pub struct FileSettingsRepository {
    path: PathBuf,
}

impl FileSettingsRepository {
    pub fn open(store_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store_dir = store_dir.as_ref();
        std::fs::create_dir_all(store_dir)?;
        Ok(Self {
            path: store_dir.join(SETTINGS_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsRepository for FileSettingsRepository {
    fn load(&self) -> Result<Option<UserSettings>, StoreError> {
        load_json(&self.path)
    }

    fn save(&self, settings: &UserSettings) -> Result<(), StoreError> {
        save_json(&self.path, settings)
    }
}
