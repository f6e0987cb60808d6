//! Domain services and repository traits for daily calorie accounting

pub mod repository;
pub mod service;
