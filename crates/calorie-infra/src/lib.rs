//! Infrastructure layer - record stores and shared display state
//!
//! File-backed implementations of the domain repository traits, plus
//! in-memory versions for tests.

pub mod memory;
pub mod persistence;
pub mod shared_state;

pub use memory::{
    InMemoryEntryRepository, InMemorySettingsRepository, InMemorySharedState, ManualClock,
    RecordingRefresher,
};
pub use persistence::{FileEntryRepository, FileSettingsRepository};
pub use shared_state::{FileSharedState, StampFileRefresher};
