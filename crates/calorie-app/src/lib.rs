//! Application service layer - accounting engine, capture flow, config

pub mod app;
pub mod config;
pub mod repository;

pub use app::{AccountingEngine, CaptureFlow, DeepLink};
pub use config::Config;
