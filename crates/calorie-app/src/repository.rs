//! Repository adapters for persistence layer

use std::path::Path;
use std::sync::Arc;

use calorie_infra::{
    FileEntryRepository, FileSettingsRepository, FileSharedState, StampFileRefresher,
};
use calorie_types::Result;
use calorie_vision::VisionService;

use crate::app::{AccountingEngine, CaptureFlow};
use crate::config::{Config, SHARED_DIR, STORE_DIR};

/// Wire an engine over file-backed stores under `config`'s data dir
pub fn open_engine(config: &Config) -> Result<AccountingEngine> {
    let engine = open_engine_at(&config.data_dir()?)?;
    Ok(engine.with_settle_delay(config.settle_delay()))
}

/// Wire an engine over file-backed stores rooted at `data_dir`
pub fn open_engine_at(data_dir: &Path) -> Result<AccountingEngine> {
    let store_dir = data_dir.join(STORE_DIR);
    let shared_dir = data_dir.join(SHARED_DIR);
    Ok(AccountingEngine::new(
        Arc::new(FileEntryRepository::open(&store_dir)?),
        Arc::new(FileSettingsRepository::open(&store_dir)?),
        Arc::new(FileSharedState::new(&shared_dir)),
        Arc::new(StampFileRefresher::new(&shared_dir)),
    ))
}

/// Build the capture flow with the HTTP analyzer
pub fn open_capture_flow(config: &Config, engine: Arc<AccountingEngine>) -> Result<CaptureFlow> {
    let analyzer = VisionService::new(config.analyzer_config())?;
    Ok(CaptureFlow::new(engine, Arc::new(analyzer)).with_env_key_fallback(true))
}
