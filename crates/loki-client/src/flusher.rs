// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of batches to the push endpoint.
//!
//! ```text
//!   Batch ──> encode (JSON) ──> POST /loki/api/v1/push ──> 2xx? ──> done
//!                                     ^                     │
//!                                     └── backoff + jitter <┘ (until attempts run out)
//! ```
//!
//! A batch is encoded once and re-sent as a whole on every attempt. Once the
//! attempts are exhausted the batch is reported and discarded; nothing is
//! kept for a later flush.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, error};

use crate::config::{Auth, ClientConfig};
use crate::constants::DEFAULT_USER_AGENT;
use crate::entry::LogEntry;
use crate::error::FlushError;
use crate::payload;
use crate::retry::RetryStrategy;
use crate::stats::ClientStats;

/// Destination of the batches assembled by the aggregator.
///
/// Implementations own their failure handling: `flush` returns once the
/// batch has been delivered or given up on.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn flush(&self, batch: &[LogEntry]);
}

#[derive(Debug, Clone)]
pub struct Flusher {
    client: reqwest::Client,
    url: String,
    labels: Arc<BTreeMap<String, String>>,
    headers: HeaderMap,
    auth: Auth,
    send_timeout: Duration,
    retry_strategy: RetryStrategy,
    stats: Arc<ClientStats>,
}

impl Flusher {
    #[must_use]
    pub fn new(config: &ClientConfig, client: reqwest::Client, stats: Arc<ClientStats>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );

        Flusher {
            client,
            url: config.push_url(),
            labels: Arc::new(config.labels.clone()),
            headers,
            auth: config.auth.clone(),
            send_timeout: config.send_timeout,
            retry_strategy: config.retry_strategy.clone(),
            stats,
        }
    }

    /// Sends `batch`, retrying per the configured strategy.
    ///
    /// Returns the error of the last attempt when every attempt failed, or
    /// the serialization error when the batch could not be encoded. An empty
    /// batch is a no-op.
    pub async fn send(&self, batch: &[LogEntry]) -> Result<(), FlushError> {
        if batch.is_empty() {
            return Ok(());
        }
        let body = payload::encode(&self.labels, batch)?;

        let attempts = self.retry_strategy.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let time = Instant::now();
            match self.send_once(body.clone()).await {
                Ok(()) => {
                    debug!(
                        "LOKI | Sent {} entries in {} ms (attempt {attempt})",
                        batch.len(),
                        time.elapsed().as_millis()
                    );
                    self.stats.record_sent(batch.len());
                    return Ok(());
                }
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    let delay = self.retry_strategy.delay_after(attempt);
                    debug!(
                        "LOKI | Attempt {attempt}/{attempts} failed after {} ms: {e}, retrying in {} ms",
                        time.elapsed().as_millis(),
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(&self, body: Vec<u8>) -> Result<(), FlushError> {
        self.stats.record_attempt();

        let request = self
            .client
            .post(&self.url)
            .timeout(self.send_timeout)
            .headers(self.headers.clone())
            .body(body);
        let request = match &self.auth {
            Auth::None => request,
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Bearer(token) => request.bearer_auth(token),
        };

        let status = request.send().await?.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FlushError::Status(status))
        }
    }
}

#[async_trait]
impl BatchSink for Flusher {
    async fn flush(&self, batch: &[LogEntry]) {
        if let Err(e) = self.send(batch).await {
            self.stats.record_failed();
            if e.is_retryable() {
                error!(
                    "LOKI | Failed to send batch of {} entries after {} attempts: {e}",
                    batch.len(),
                    self.retry_strategy.attempts()
                );
            } else {
                error!("LOKI | Discarding batch of {} entries: {e}", batch.len());
            }
        }
    }
}
