// src/models/mod.rs

//! Domain models for the publisher.
//!
//! Health report snapshots produced by the scheduler and the static
//! configuration consumed at startup.

mod config;
mod report;

// Re-export all public types
pub use config::{Config, HttpConfig, PolicyConfig, ResilienceConfig, TelegramConfig};
pub use report::{HealthReport, HealthReportEntry, HealthStatus};
