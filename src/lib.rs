//! Lactron - milk-quality batch monitoring engine
//!
//! Accepts gas-sensor submissions per physical milk batch, derives a spoilage
//! verdict and shelf-life estimate (external ML predictor with a deterministic
//! fallback), and persists raw readings plus immutable batch-history snapshots.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
