//! File-backed persistence

pub mod file_entry_repo;
pub mod file_settings_repo;
pub mod json_file;

pub use file_entry_repo::FileEntryRepository;
pub use file_settings_repo::FileSettingsRepository;
