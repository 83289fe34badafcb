// src/transport/mod.rs

//! Outbound HTTP transport.
//!
//! The publisher issues one logical POST through a [`Transport`]. How many
//! physical attempts happen underneath is the business of the wrapper in
//! [`retry`], never of the publisher.

pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};

pub use retry::{ResilientTransport, RetryPolicy};

/// Status line of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
}

impl TransportResponse {
    /// Build a response, filling the reason from the canonical phrase.
    pub fn from_status(status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        Self { status, reason }
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for transports able to POST a JSON body.
///
/// `Err` means no HTTP response was obtained (connection failure, timeout).
/// A non-2xx response is still `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<TransportResponse> {
        (**self).post_json(url, body).await
    }
}

/// [`Transport`] backed by a shared `reqwest::Client`.
///
/// The client is cheap to clone and keeps its own connection pool; this
/// type only borrows it per call.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<TransportResponse> {
        // The request URL carries the bot token; keep it out of error text.
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            // Telegram explains rejections in the body; surface it at debug level only.
            if let Ok(text) = response.text().await {
                log::debug!("Bot API responded {}: {}", status, text);
            }
        }
        Ok(TransportResponse::from_status(status.as_u16()))
    }
}
