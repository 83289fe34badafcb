// src/publisher/mod.rs

//! Health report publishing to Telegram.
//!
//! Each publish tick runs the same steps:
//!
//! 1. **Decide** with the policy predicate against the previous report
//! 2. **Render** the report text with the policy formatter
//! 3. **Send** `{"chat_id", "text"}` to `{base_url}/bot{token}/sendMessage`
//!    through the resilient transport
//! 4. **Classify** the outcome and log it
//! 5. **Finalize** by storing the report as the previous one
//!
//! Delivery failures (non-2xx, transport errors, timeouts, cancellation) are
//! logged and never returned. Only a failing predicate or formatter produces
//! an `Err`, in which case the previous report is left untouched.

pub mod cancel;
pub mod policy;
pub mod state;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, HealthReport, TelegramConfig};
use crate::transport::{
    ReqwestTransport, ResilientTransport, RetryPolicy, Transport, TransportResponse,
};
use crate::utils;

pub use cancel::CancellationToken;
pub use policy::{PublishPolicy, formatters, predicates};
pub use state::PublisherState;

/// Entry point used by the health-check scheduler.
///
/// Implementations must be `Send + Sync`: one publisher may be shared by
/// several schedules and called concurrently.
#[async_trait]
pub trait HealthCheckPublisher: Send + Sync {
    /// Publish a report. Completes without error on any delivery failure.
    async fn publish(&self, report: Arc<HealthReport>, cancel: &CancellationToken) -> Result<()>;

    /// Return the backend name (e.g., `"telegram"`).
    fn name(&self) -> &str;
}

/// What happened to one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The predicate declined the report; nothing was sent.
    Skipped,
    /// The Bot API accepted the message.
    Delivered { status: u16 },
    /// The Bot API answered with a non-success status after all retries.
    Rejected { status: u16, reason: String },
    /// No response was obtained after all retries.
    Failed { error: String },
    /// The caller cancelled the send while it was in flight.
    Cancelled,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Publishes health reports to one fixed Telegram chat.
pub struct TelegramPublisher {
    target: TelegramConfig,
    endpoint: String,
    transport: Arc<dyn Transport>,
    policy: PublishPolicy,
    state: PublisherState,
}

impl TelegramPublisher {
    /// Create a publisher over an already-configured transport.
    ///
    /// The target is assumed validated at startup (see [`Config::validate`]).
    pub fn new(
        target: TelegramConfig,
        transport: Arc<dyn Transport>,
        policy: PublishPolicy,
    ) -> Self {
        if !utils::is_https(&target.base_url) {
            log::warn!(
                "Telegram base URL {} is not HTTPS; only use this for local testing",
                target.base_url
            );
        }
        let endpoint = utils::send_message_url(&target.base_url, &target.bot_token);
        Self {
            target,
            endpoint,
            transport,
            policy,
            state: PublisherState::new(),
        }
    }

    /// Build a publisher from validated configuration over a shared HTTP client.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Result<Self> {
        config.validate()?;
        let transport = ResilientTransport::new(
            ReqwestTransport::new(client),
            RetryPolicy::from_config(&config.resilience),
        );
        let policy = PublishPolicy::from_config(&config.policy)?;
        Ok(Self::new(config.telegram.clone(), Arc::new(transport), policy))
    }

    /// Replace the publish policy.
    pub fn with_policy(mut self, policy: PublishPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn target(&self) -> &TelegramConfig {
        &self.target
    }

    /// The most recently seen report, published or not.
    pub fn previous_report(&self) -> Option<Arc<HealthReport>> {
        self.state.previous()
    }

    /// Run one publish tick and report what happened.
    ///
    /// Returns `Err` only when the predicate or formatter fails.
    pub async fn publish_report(
        &self,
        report: Arc<HealthReport>,
        cancel: &CancellationToken,
    ) -> Result<DeliveryOutcome> {
        let previous = self.state.previous();

        if !self.policy.should_publish(&report, previous.as_deref())? {
            log::debug!(
                "Skipping {} report for chat {}: predicate declined",
                report.status,
                self.target.chat_id
            );
            self.state.replace(report);
            return Ok(DeliveryOutcome::Skipped);
        }

        let text = self.policy.render(&report)?;
        let payload = serde_json::json!({
            "chat_id": self.target.chat_id,
            "text": text,
        });

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => DeliveryOutcome::Cancelled,
            result = self.transport.post_json(&self.endpoint, &payload) => classify(result),
        };
        self.log_outcome(&report, &outcome);

        // Advance even after a failed or cancelled send.
        self.state.replace(report);
        Ok(outcome)
    }

    fn log_outcome(&self, report: &HealthReport, outcome: &DeliveryOutcome) {
        let chat_id = self.target.chat_id;
        match outcome {
            DeliveryOutcome::Delivered { status } => log::info!(
                "Published {} report to chat {} (HTTP {})",
                report.status,
                chat_id,
                status
            ),
            DeliveryOutcome::Rejected { status, reason } => log::error!(
                "Failed to publish {} report to chat {}: HTTP {} {}",
                report.status,
                chat_id,
                status,
                reason
            ),
            DeliveryOutcome::Failed { error } => log::error!(
                "Failed to publish {} report to chat {}: {}",
                report.status,
                chat_id,
                error
            ),
            DeliveryOutcome::Cancelled => log::warn!(
                "Publishing {} report to chat {} was cancelled",
                report.status,
                chat_id
            ),
            DeliveryOutcome::Skipped => {}
        }
    }
}

/// Map a transport result to a delivery outcome.
fn classify(result: Result<TransportResponse>) -> DeliveryOutcome {
    match result {
        Ok(response) if response.is_success() => DeliveryOutcome::Delivered {
            status: response.status,
        },
        Ok(response) => DeliveryOutcome::Rejected {
            status: response.status,
            reason: response.reason,
        },
        Err(e) => DeliveryOutcome::Failed {
            error: e.to_string(),
        },
    }
}

#[async_trait]
impl HealthCheckPublisher for TelegramPublisher {
    async fn publish(&self, report: Arc<HealthReport>, cancel: &CancellationToken) -> Result<()> {
        self.publish_report(report, cancel).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::HealthStatus;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A transport that records requests and answers with a fixed outcome.
    struct RecordingTransport {
        requests: Mutex<Vec<(String, serde_json::Value)>>,
        status: Option<u16>,
        delay: Duration,
    }

    impl RecordingTransport {
        fn responding(status: u16) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                status: Some(status),
                delay: Duration::ZERO,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                status: None,
                delay: Duration::ZERO,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                status: Some(200),
                delay,
            })
        }

        fn requests(&self) -> Vec<(String, serde_json::Value)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn post_json(
            &self,
            url: &str,
            body: &serde_json::Value,
        ) -> Result<TransportResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            tokio::time::sleep(self.delay).await;
            match self.status {
                Some(status) => Ok(TransportResponse::from_status(status)),
                None => Err(AppError::transport("connection refused")),
            }
        }
    }

    fn target() -> TelegramConfig {
        TelegramConfig::new("https://api.telegram.org", "123:ABC", -2718281828)
    }

    fn publisher(transport: Arc<RecordingTransport>, policy: PublishPolicy) -> TelegramPublisher {
        TelegramPublisher::new(target(), transport, policy)
    }

    fn report(status: HealthStatus) -> Arc<HealthReport> {
        Arc::new(HealthReport::new(status))
    }

    #[tokio::test]
    async fn test_declined_report_sends_nothing_but_advances_state() {
        let transport = RecordingTransport::responding(200);
        let policy = PublishPolicy::new()
            .with_predicate(|current, _| current.status != HealthStatus::Healthy);
        let publisher = publisher(Arc::clone(&transport), policy);
        let healthy = report(HealthStatus::Healthy);

        let outcome = publisher
            .publish_report(Arc::clone(&healthy), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Skipped);
        assert!(transport.requests().is_empty());
        assert!(Arc::ptr_eq(&publisher.previous_report().unwrap(), &healthy));
    }

    #[tokio::test]
    async fn test_approved_report_posts_chat_id_and_text() {
        let transport = RecordingTransport::responding(200);
        let policy = PublishPolicy::new()
            .with_predicate(|current, _| current.status != HealthStatus::Healthy)
            .with_formatter(|current| format!("ALERT: {}", current.status));
        let publisher = publisher(Arc::clone(&transport), policy);

        let outcome = publisher
            .publish_report(report(HealthStatus::Unhealthy), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Delivered { status: 200 });
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].0,
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
        assert_eq!(
            requests[0].1,
            serde_json::json!({"chat_id": -2718281828i64, "text": "ALERT: Unhealthy"})
        );
    }

    #[tokio::test]
    async fn test_default_policy_publishes_every_report_by_status_name() {
        let transport = RecordingTransport::responding(200);
        let publisher = publisher(Arc::clone(&transport), PublishPolicy::default());
        let cancel = CancellationToken::new();

        for status in [
            HealthStatus::Healthy,
            HealthStatus::Healthy,
            HealthStatus::Degraded,
            HealthStatus::Unhealthy,
        ] {
            publisher.publish_report(report(status), &cancel).await.unwrap();
        }

        let texts: Vec<_> = transport
            .requests()
            .into_iter()
            .map(|(_, body)| body["text"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["Healthy", "Healthy", "Degraded", "Unhealthy"]);
    }

    #[tokio::test]
    async fn test_rejected_response_is_not_an_error() {
        let transport = RecordingTransport::responding(400);
        let publisher = publisher(Arc::clone(&transport), PublishPolicy::default());
        let current = report(HealthStatus::Unhealthy);

        let outcome = publisher
            .publish_report(Arc::clone(&current), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected {
                status: 400,
                reason: "Bad Request".to_string()
            }
        );
        assert!(Arc::ptr_eq(&publisher.previous_report().unwrap(), &current));
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_an_error() {
        let transport = RecordingTransport::failing();
        let publisher = publisher(Arc::clone(&transport), PublishPolicy::default());
        let current = report(HealthStatus::Degraded);

        let result = publisher
            .publish(Arc::clone(&current), &CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert!(Arc::ptr_eq(&publisher.previous_report().unwrap(), &current));
    }

    #[tokio::test]
    async fn test_status_change_predicate_across_ticks() {
        let transport = RecordingTransport::responding(200);
        let policy = PublishPolicy::new().with_predicate(predicates::on_status_change);
        let publisher = publisher(Arc::clone(&transport), policy);
        let cancel = CancellationToken::new();

        let statuses = [
            HealthStatus::Healthy,
            HealthStatus::Healthy,
            HealthStatus::Unhealthy,
            HealthStatus::Unhealthy,
            HealthStatus::Healthy,
        ];
        let mut outcomes = Vec::new();
        for status in statuses {
            outcomes.push(publisher.publish_report(report(status), &cancel).await.unwrap());
        }

        let sent: Vec<bool> = outcomes.iter().map(|o| o.is_delivered()).collect();
        assert_eq!(sent, vec![true, false, true, false, true]);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_predicate_failure_propagates_and_keeps_state() {
        let transport = RecordingTransport::responding(200);
        let publisher = publisher(Arc::clone(&transport), PublishPolicy::default());
        let cancel = CancellationToken::new();

        let first = report(HealthStatus::Healthy);
        publisher.publish_report(Arc::clone(&first), &cancel).await.unwrap();

        let failing = PublishPolicy::new().with_try_predicate(|_, _| Err("bug".into()));
        let publisher = publisher.with_policy(failing);
        let err = publisher
            .publish(report(HealthStatus::Unhealthy), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_policy());
        assert_eq!(transport.requests().len(), 1);
        assert!(Arc::ptr_eq(&publisher.previous_report().unwrap(), &first));
    }

    #[tokio::test]
    async fn test_formatter_failure_propagates_without_sending() {
        let transport = RecordingTransport::responding(200);
        let policy = PublishPolicy::new().with_try_formatter(|_| Err("template missing".into()));
        let publisher = publisher(Arc::clone(&transport), policy);

        let err = publisher
            .publish(report(HealthStatus::Degraded), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Policy(_)));
        assert!(transport.requests().is_empty());
        assert!(publisher.previous_report().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_send_and_still_advances_state() {
        let transport = RecordingTransport::slow(Duration::from_secs(60));
        let publisher = Arc::new(publisher(Arc::clone(&transport), PublishPolicy::default()));
        let cancel = CancellationToken::new();
        let current = report(HealthStatus::Unhealthy);

        let task = {
            let publisher = Arc::clone(&publisher);
            let cancel = cancel.clone();
            let current = Arc::clone(&current);
            tokio::spawn(async move { publisher.publish_report(current, &cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, DeliveryOutcome::Cancelled);
        assert_eq!(transport.requests().len(), 1);
        assert!(Arc::ptr_eq(&publisher.previous_report().unwrap(), &current));
    }

    #[tokio::test]
    async fn test_name() {
        let publisher = publisher(RecordingTransport::responding(200), PublishPolicy::default());
        assert_eq!(publisher.name(), "telegram");
    }

    #[test]
    fn test_from_config_rejects_invalid_target() {
        let mut config = Config::default();
        config.telegram.bot_token = "123:ABC".to_string();
        config.telegram.chat_id = 0;
        let client = reqwest::Client::new();
        assert!(TelegramPublisher::from_config(&config, client).is_err());
    }
}
