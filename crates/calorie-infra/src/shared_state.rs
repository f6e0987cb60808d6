//! Shared display state for the widget process
//!
//! The snapshot is one small JSON record in a directory both processes can
//! read. After each write the refresher touches a stamp file the display
//! side watches for changes.

use std::path::{Path, PathBuf};

use chrono::Utc;

use calorie_domain::repository::{DisplayRefresher, SharedStateChannel};
use calorie_types::{CalorieSnapshot, StoreError};

use crate::persistence::json_file::{load_json, save_json};

const SNAPSHOT_FILE: &str = "calorie_snapshot.json";
const REFRESH_STAMP_FILE: &str = "refresh.stamp";

/// [`SharedStateChannel`] backed by `calorie_snapshot.json`
#[derive(Debug, Clone)]
pub struct FileSharedState {
    path: PathBuf,
}

impl FileSharedState {
    pub fn new(shared_dir: impl AsRef<Path>) -> Self {
        Self {
            path: shared_dir.as_ref().join(SNAPSHOT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SharedStateChannel for FileSharedState {
    fn write(&self, snapshot: &CalorieSnapshot) -> Result<(), StoreError> {
        save_json(&self.path, snapshot)
    }

    fn read(&self) -> Option<CalorieSnapshot> {
        match load_json(&self.path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "shared snapshot unreadable");
                None
            }
        }
    }
}

/// Refresh signal that rewrites a stamp file with the current time
#[derive(Debug, Clone)]
pub struct StampFileRefresher {
    path: PathBuf,
}

impl StampFileRefresher {
    pub fn new(shared_dir: impl AsRef<Path>) -> Self {
        Self {
            path: shared_dir.as_ref().join(REFRESH_STAMP_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DisplayRefresher for StampFileRefresher {
    fn request_refresh(&self) {
        // best effort
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "display refresh directory unavailable");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, Utc::now().to_rfc3339()) {
            tracing::warn!(path = %self.path.display(), error = %e, "display refresh signal failed");
        }
    }
}
