//! Publish policy: whether a report is sent, and what text is sent.
//!
//! Both hooks are supplied by the embedding application and treated as
//! opaque. They must be quick and synchronous. A hook that fails surfaces as
//! [`AppError::Policy`] from the publish call rather than being swallowed.

use std::fmt;
use std::sync::Arc;

use crate::error::{AppError, PolicyError, Result};
use crate::models::{HealthReport, PolicyConfig};

/// Decides whether `current` should be published given the previous report.
pub type Predicate = Arc<
    dyn Fn(&HealthReport, Option<&HealthReport>) -> std::result::Result<bool, PolicyError>
        + Send
        + Sync,
>;

/// Renders a report into message text.
pub type Formatter =
    Arc<dyn Fn(&HealthReport) -> std::result::Result<String, PolicyError> + Send + Sync>;

/// Predicate and formatter pair used by the publisher.
#[derive(Clone)]
pub struct PublishPolicy {
    predicate: Predicate,
    formatter: Formatter,
}

impl PublishPolicy {
    /// Publish every report, rendered as its status name.
    pub fn new() -> Self {
        Self {
            predicate: Arc::new(|current: &HealthReport, previous: Option<&HealthReport>| {
                Ok::<_, PolicyError>(predicates::always(current, previous))
            }),
            formatter: Arc::new(|current: &HealthReport| {
                Ok::<_, PolicyError>(formatters::status_name(current))
            }),
        }
    }

    /// Build the policy named by configuration.
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        config.validate()?;
        let policy = match config.predicate.as_str() {
            "on_change" => Self::new().with_predicate(predicates::on_status_change),
            "not_healthy" => Self::new().with_predicate(predicates::not_healthy),
            _ => Self::new(),
        };
        let policy = match config.formatter.as_str() {
            "detailed" => policy.with_formatter(formatters::detailed),
            _ => policy,
        };
        Ok(policy)
    }

    /// Replace the predicate with an infallible one.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&HealthReport, Option<&HealthReport>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(
            move |current: &HealthReport, previous: Option<&HealthReport>| {
                Ok::<_, PolicyError>(predicate(current, previous))
            },
        );
        self
    }

    /// Replace the predicate with one that may fail.
    pub fn with_try_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&HealthReport, Option<&HealthReport>) -> std::result::Result<bool, PolicyError>
            + Send
            + Sync
            + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Replace the formatter with an infallible one.
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&HealthReport) -> String + Send + Sync + 'static,
    {
        self.formatter = Arc::new(move |current: &HealthReport| {
            Ok::<_, PolicyError>(formatter(current))
        });
        self
    }

    /// Replace the formatter with one that may fail.
    pub fn with_try_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&HealthReport) -> std::result::Result<String, PolicyError> + Send + Sync + 'static,
    {
        self.formatter = Arc::new(formatter);
        self
    }

    /// Change detection: delegate to the predicate.
    pub fn should_publish(
        &self,
        current: &HealthReport,
        previous: Option<&HealthReport>,
    ) -> Result<bool> {
        (self.predicate)(current, previous).map_err(AppError::policy)
    }

    /// Message rendering: delegate to the formatter.
    pub fn render(&self, current: &HealthReport) -> Result<String> {
        (self.formatter)(current).map_err(AppError::policy)
    }
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PublishPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishPolicy").finish_non_exhaustive()
    }
}

/// Built-in predicates.
pub mod predicates {
    use crate::models::{HealthReport, HealthStatus};

    /// Publish on every tick.
    pub fn always(_current: &HealthReport, _previous: Option<&HealthReport>) -> bool {
        true
    }

    /// Publish the first report and then only when the overall status changes.
    pub fn on_status_change(current: &HealthReport, previous: Option<&HealthReport>) -> bool {
        previous.is_none_or(|p| p.status != current.status)
    }

    /// Publish whenever the overall status is anything but healthy.
    pub fn not_healthy(current: &HealthReport, _previous: Option<&HealthReport>) -> bool {
        current.status != HealthStatus::Healthy
    }
}

/// Built-in formatters.
pub mod formatters {
    use std::fmt::Write;

    use crate::models::HealthReport;

    /// The overall status name, e.g. `Unhealthy`.
    pub fn status_name(current: &HealthReport) -> String {
        current.status.to_string()
    }

    /// Overall status followed by one line per check, sorted by name.
    ///
    /// ```text
    /// Unhealthy (total 1250 ms)
    /// cache: Healthy (3 ms)
    /// db: Unhealthy (1200 ms) - primary unreachable [error: connection refused]
    /// ```
    pub fn detailed(current: &HealthReport) -> String {
        let mut text = format!(
            "{} (total {} ms)",
            current.status,
            current.total_duration.as_millis()
        );
        for (name, entry) in &current.entries {
            let _ = write!(
                text,
                "\n{}: {} ({} ms)",
                name,
                entry.status,
                entry.duration.as_millis()
            );
            if let Some(description) = &entry.description {
                let _ = write!(text, " - {}", description);
            }
            if let Some(error) = &entry.error {
                let _ = write!(text, " [error: {}]", error);
            }
        }
        text
    }
}
