//! Application use cases

pub mod accounting;
pub mod capture;

pub use accounting::{AccountingEngine, DEFAULT_SETTLE_DELAY};
pub use capture::{CaptureFlow, DeepLink, DEEP_LINK_SCHEME};
