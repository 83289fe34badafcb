// src/models/report.rs

//! Health report snapshots handed to the publisher by the scheduler.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall or per-check health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// Any status name this version does not know about.
    #[serde(other)]
    Unknown,
}

impl HealthStatus {
    /// Textual name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
            HealthStatus::Unknown => "Unknown",
        }
    }

    /// Parse a status name, case-insensitively. Unrecognized names map to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "healthy" => HealthStatus::Healthy,
            "degraded" => HealthStatus::Degraded,
            "unhealthy" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }

    /// Ordering used when aggregating entries. `Unknown` is treated as unhealthy.
    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy | HealthStatus::Unknown => 2,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single named health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReportEntry {
    pub status: HealthStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,

    /// Error detail captured by the check, if it failed with one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReportEntry {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            description: None,
            duration: Duration::ZERO,
            error: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Immutable snapshot of every registered check at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,

    #[serde(default, rename = "total_duration_ms", with = "duration_ms")]
    pub total_duration: Duration,

    #[serde(default)]
    pub entries: BTreeMap<String, HealthReportEntry>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl HealthReport {
    /// Create a report with an explicit overall status and no checks.
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            total_duration: Duration::ZERO,
            entries: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a report whose overall status is the worst entry status.
    ///
    /// A report with zero entries is `Healthy`.
    pub fn from_entries(
        entries: BTreeMap<String, HealthReportEntry>,
        total_duration: Duration,
    ) -> Self {
        let status = entries
            .values()
            .map(|e| e.status)
            .max_by_key(HealthStatus::severity)
            .map(|s| match s {
                HealthStatus::Unknown => HealthStatus::Unhealthy,
                other => other,
            })
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            total_duration,
            entries,
            created_at: Utc::now(),
        }
    }

    /// Add or replace a named check result.
    pub fn with_entry(mut self, name: impl Into<String>, entry: HealthReportEntry) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn with_total_duration(mut self, total_duration: Duration) -> Self {
        self.total_duration = total_duration;
        self
    }
}

/// Serialize durations as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
