//! Last published report, shared across concurrent publish calls.
//!
//! The slot is replaced whole, never merged: readers see a complete prior
//! report or none. Concurrent writers race and the last `replace` wins;
//! nothing ties the final value to the most recently started call.

use std::sync::{Arc, Mutex, PoisonError};

use crate::models::HealthReport;

/// Single-slot, last-write-wins holder of the previous report.
#[derive(Debug, Default)]
pub struct PublisherState {
    previous: Mutex<Option<Arc<HealthReport>>>,
}

impl PublisherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the previous report.
    pub fn previous(&self) -> Option<Arc<HealthReport>> {
        self.previous
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store `report` as the previous report, returning the one it replaced.
    pub fn replace(&self, report: Arc<HealthReport>) -> Option<Arc<HealthReport>> {
        self.previous
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(report)
    }
}
