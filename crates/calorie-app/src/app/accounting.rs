//! Accounting Engine - daily calorie bookkeeping
//!
//! Owns the entry collection and the settings record through the injected
//! repositories. Every mutation follows the same sequence:
//! 1. Take the write lock (one mutation in flight at a time)
//! 2. Apply and commit the change to the record store
//! 3. Recompute today's totals and write the shared snapshot
//! 4. Signal the display surface, after the settle delay if one is set
//!
//! Store failures before the commit are returned to the caller. Once the
//! change is committed, a failure to recompute or write the snapshot is
//! logged and the mutation still reports success; the snapshot is
//! display-only.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use calorie_domain::repository::{
    Clock, DisplayRefresher, EntryRepository, SettingsRepository, SharedStateChannel, SystemClock,
};
use calorie_domain::service::{adjusted_servings, day_window_start, DailySummary, MAX_RESET_HOUR};
use calorie_types::{
    CalorieSnapshot, Error, FoodEntry, Result, SettingsUpdate, UserSettings,
};

/// Default delay between the snapshot write and the refresh signal
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Daily accounting over an entry store and a settings record
pub struct AccountingEngine {
    entries: Arc<dyn EntryRepository>,
    settings: Arc<dyn SettingsRepository>,
    shared: Arc<dyn SharedStateChannel>,
    refresher: Arc<dyn DisplayRefresher>,
    clock: Arc<dyn Clock>,
    settle_delay: Duration,
    write_lock: Mutex<()>,
    pending_refreshes: TaskTracker,
}

impl AccountingEngine {
    pub fn new(
        entries: Arc<dyn EntryRepository>,
        settings: Arc<dyn SettingsRepository>,
        shared: Arc<dyn SharedStateChannel>,
        refresher: Arc<dyn DisplayRefresher>,
    ) -> Self {
        Self {
            entries,
            settings,
            shared,
            refresher,
            clock: Arc::new(SystemClock),
            settle_delay: DEFAULT_SETTLE_DELAY,
            write_lock: Mutex::new(()),
            pending_refreshes: TaskTracker::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Zero signals the display inline, right after the snapshot write
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn shared_state(&self) -> &Arc<dyn SharedStateChannel> {
        &self.shared
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current settings, creating and saving defaults on first use
    pub async fn settings(&self) -> Result<UserSettings> {
        let _guard = self.write_lock.lock().await;
        self.load_settings()
    }

    /// Start of the active day window
    pub async fn window_start(&self) -> Result<DateTime<Utc>> {
        let settings = self.settings().await?;
        Ok(self.window_start_at(&settings, self.clock.now()))
    }

    /// Entries in the active window, newest first
    pub async fn today_entries(&self) -> Result<Vec<FoodEntry>> {
        Ok(self.summary().await?.entries)
    }

    pub async fn consumed_today(&self) -> Result<i64> {
        Ok(self.summary().await?.consumed)
    }

    /// Target minus consumed; negative once the target is exceeded
    pub async fn remaining_today(&self) -> Result<i64> {
        Ok(self.summary().await?.remaining)
    }

    pub async fn summary(&self) -> Result<DailySummary> {
        let settings = self.settings().await?;
        self.summarize(&settings, self.clock.now())
    }

    pub async fn entry(&self, id: Uuid) -> Result<Option<FoodEntry>> {
        Ok(self.entries.find_by_id(id)?)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Log a new entry with one serving, stamped now
    pub async fn add_entry(
        &self,
        image_data: Option<Vec<u8>>,
        description: &str,
        calories_per_serving: u32,
    ) -> Result<FoodEntry> {
        let _guard = self.write_lock.lock().await;

        let now = self.clock.now();
        let entry = FoodEntry::new(image_data, description, calories_per_serving, now);
        self.entries.insert(&entry)?;
        info!(
            id = %entry.id,
            calories = calories_per_serving,
            has_image = entry.has_image(),
            "entry added"
        );

        self.publish(now);
        Ok(entry)
    }

    /// Remove an entry; returns false (and changes nothing) if it is absent
    pub async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        if !self.entries.delete(id)? {
            debug!(%id, "delete skipped, no such entry");
            return Ok(false);
        }
        info!(%id, "entry deleted");

        self.publish(self.clock.now());
        Ok(true)
    }

    /// Add `delta` servings, never going below one
    pub async fn adjust_servings(&self, id: Uuid, delta: i64) -> Result<FoodEntry> {
        let _guard = self.write_lock.lock().await;

        let mut entry = self.require_entry(id)?;
        let before = entry.servings;
        entry.servings = adjusted_servings(before, delta);
        self.commit_update(&entry)?;
        info!(%id, before, after = entry.servings, "servings adjusted");

        self.publish(self.clock.now());
        Ok(entry)
    }

    /// Overwrite calories and/or servings. A servings value below one is
    /// ignored; the rest of the edit still applies.
    pub async fn edit_entry(
        &self,
        id: Uuid,
        calories_per_serving: Option<u32>,
        servings: Option<u32>,
    ) -> Result<FoodEntry> {
        let _guard = self.write_lock.lock().await;

        let mut entry = self.require_entry(id)?;
        if let Some(calories) = calories_per_serving {
            entry.calories_per_serving = calories;
        }
        match servings {
            Some(0) => debug!(%id, "ignoring servings below one"),
            Some(n) => entry.servings = n,
            None => {}
        }
        self.commit_update(&entry)?;
        info!(
            %id,
            calories = entry.calories_per_serving,
            servings = entry.servings,
            "entry edited"
        );

        self.publish(self.clock.now());
        Ok(entry)
    }

    /// Drop the stored photo bytes of an entry
    pub async fn strip_image(&self, id: Uuid) -> Result<FoodEntry> {
        let _guard = self.write_lock.lock().await;

        let mut entry = self.require_entry(id)?;
        if entry.image_data.take().is_none() {
            return Ok(entry);
        }
        self.commit_update(&entry)?;
        info!(%id, "entry image stripped");

        self.publish(self.clock.now());
        Ok(entry)
    }

    /// Apply the provided fields; omitted fields keep their value
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<UserSettings> {
        validate_update(&update)?;

        let _guard = self.write_lock.lock().await;

        let mut settings = self.load_settings()?;
        if let Some(target) = update.daily_calorie_target {
            settings.daily_calorie_target = target;
        }
        if let Some(hour) = update.day_reset_hour {
            settings.day_reset_hour = hour;
        }
        if let Some(provider) = update.provider {
            settings.provider = provider;
        }
        if let Some(key) = update.api_key {
            settings.api_key = key.trim().to_string();
        }
        self.settings.save(&settings)?;
        info!(
            target = settings.daily_calorie_target,
            reset_hour = settings.day_reset_hour,
            provider = %settings.provider,
            api_key_set = settings.has_api_key(),
            "settings updated"
        );

        if let Err(e) = self.publish_with(&settings, self.clock.now()) {
            warn!(error = %e, "settings saved but snapshot not published");
        }
        Ok(settings)
    }

    /// Recompute and publish without changing anything
    pub async fn republish(&self) -> Result<CalorieSnapshot> {
        let _guard = self.write_lock.lock().await;
        let settings = self.load_settings()?;
        self.publish_with(&settings, self.clock.now())
    }

    /// Wait for delayed refresh signals still in flight
    pub async fn flush(&self) {
        self.pending_refreshes.close();
        self.pending_refreshes.wait().await;
        self.pending_refreshes.reopen();
    }

    // ------------------------------------------------------------------
    // Internals (callers hold the write lock)
    // ------------------------------------------------------------------

    fn load_settings(&self) -> Result<UserSettings> {
        if let Some(settings) = self.settings.load()? {
            return Ok(settings);
        }
        let settings = UserSettings::default();
        self.settings.save(&settings)?;
        debug!("created default settings");
        Ok(settings)
    }

    fn window_start_at(&self, settings: &UserSettings, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_now = now.with_timezone(&Local);
        day_window_start(&local_now, settings.day_reset_hour).with_timezone(&Utc)
    }

    fn summarize(&self, settings: &UserSettings, now: DateTime<Utc>) -> Result<DailySummary> {
        let window_start = self.window_start_at(settings, now);
        let entries = self.entries.find_since(window_start)?;
        Ok(DailySummary::new(
            window_start,
            settings.daily_calorie_target,
            entries,
        ))
    }

    fn require_entry(&self, id: Uuid) -> Result<FoodEntry> {
        self.entries
            .find_by_id(id)?
            .ok_or_else(|| Error::EntryNotFound(id.to_string()))
    }

    fn commit_update(&self, entry: &FoodEntry) -> Result<()> {
        if self.entries.update(entry)? {
            Ok(())
        } else {
            Err(Error::EntryNotFound(entry.id.to_string()))
        }
    }

    /// Publish after a committed change; the change stands if this fails
    fn publish(&self, now: DateTime<Utc>) {
        let result = self
            .load_settings()
            .and_then(|settings| self.publish_with(&settings, now));
        if let Err(e) = result {
            warn!(error = %e, "change saved but snapshot not published");
        }
    }

    fn publish_with(&self, settings: &UserSettings, now: DateTime<Utc>) -> Result<CalorieSnapshot> {
        let snapshot = self.summarize(settings, now)?.snapshot(now);

        if let Err(e) = self.shared.write(&snapshot) {
            warn!(error = %e, "failed to publish calorie snapshot");
            return Ok(snapshot);
        }
        debug!(
            remaining = snapshot.remaining_calories,
            consumed = snapshot.consumed_calories,
            "snapshot published"
        );

        if self.settle_delay.is_zero() {
            self.refresher.request_refresh();
        } else {
            let refresher = Arc::clone(&self.refresher);
            let delay = self.settle_delay;
            self.pending_refreshes.spawn(async move {
                tokio::time::sleep(delay).await;
                refresher.request_refresh();
            });
        }
        Ok(snapshot)
    }
}

fn validate_update(update: &SettingsUpdate) -> Result<()> {
    if let Some(hour) = update.day_reset_hour {
        if hour > MAX_RESET_HOUR {
            return Err(Error::InvalidInput(format!(
                "reset hour must be 0-{MAX_RESET_HOUR}, got {hour}"
            )));
        }
    }
    if let Some(target) = update.daily_calorie_target {
        if target < 0 {
            return Err(Error::InvalidInput(format!(
                "daily target must not be negative, got {target}"
            )));
        }
    }
    Ok(())
}
