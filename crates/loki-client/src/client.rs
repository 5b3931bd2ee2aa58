// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client construction and shutdown.
//!
//! [`LokiClient::new`] wires the pipeline together and spawns the
//! aggregator on the current tokio runtime:
//!
//! ```text
//!   write() ──> normalize ──> IngestionQueue ──> BatchAggregator ──> Flusher ──> Loki
//! ```
//!
//! The returned [`ShutdownHandle`] closes the queue and waits until
//! everything accepted so far has gone through a flush attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::aggregator::BatchAggregator;
use crate::config::ClientConfig;
use crate::entry::{normalize, LogEntry, TimestampPrecision};
use crate::error::{ConfigError, EntryError};
use crate::flusher::Flusher;
use crate::http;
use crate::queue::{EnqueueOutcome, IngestionQueue};
use crate::stats::{ClientStats, StatsSnapshot};

/// Producer-facing half of the client. Cheap to clone; clones share the
/// same queue and worker.
#[derive(Debug, Clone)]
pub struct LokiClient {
    queue: IngestionQueue,
    precision: TimestampPrecision,
    stats: Arc<ClientStats>,
    shutdown: ShutdownHandle,
}

impl LokiClient {
    /// Validates `config`, starts the aggregator, and returns the client
    /// with its shutdown handle.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, the HTTP client cannot be
    /// built, or no tokio runtime is running.
    pub fn new(config: ClientConfig) -> Result<(Self, ShutdownHandle), ConfigError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let stats = Arc::new(ClientStats::default());
        let flusher = Flusher::new(&config, http::resolve_client(&config)?, Arc::clone(&stats));
        let (queue, rx) =
            IngestionQueue::new(config.buffer_size, config.write_timeout, Arc::clone(&stats));

        let cancel_token = CancellationToken::new();
        let aggregator = BatchAggregator::new(
            rx,
            flusher,
            config.batch_size,
            config.period,
            cancel_token.clone(),
        );
        let worker = runtime.spawn(aggregator.run());
        let (finished_tx, finished_rx) = watch::channel(false);
        runtime.spawn(async move {
            if let Err(e) = worker.await {
                error!("LOKI | Batch aggregator task failed: {e}");
            }
            finished_tx.send_replace(true);
        });
        debug!("LOKI | Client started for {}", config.push_url());

        let shutdown = ShutdownHandle {
            inner: Arc::new(ShutdownState {
                cancel_token,
                grace: config.shutdown_grace,
                finished: finished_rx,
                done: OnceCell::new(),
            }),
        };
        let client = Self {
            queue,
            precision: config.timestamp_precision,
            stats,
            shutdown: shutdown.clone(),
        };
        Ok((client, shutdown))
    }

    /// Normalizes one serialized record and queues it.
    ///
    /// Returns the number of bytes consumed. An entry dropped because the
    /// queue stayed full still counts as consumed: the drop is reported to
    /// the diagnostic log, not to the caller.
    ///
    /// # Errors
    ///
    /// Returns the normalizer's error when the record is malformed; nothing
    /// is queued in that case.
    pub async fn write(&self, record: &[u8]) -> Result<usize, EntryError> {
        let entry = normalize(record, self.precision).inspect_err(|_| {
            self.stats.record_rejected();
        })?;
        self.queue.enqueue(entry).await;
        Ok(record.len())
    }

    /// Queues an entry that is already normalized.
    pub async fn push(&self, entry: LogEntry) -> EnqueueOutcome {
        self.queue.enqueue(entry).await
    }

    /// Entries waiting for the aggregator.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Same as [`ShutdownHandle::shutdown`].
    pub async fn shutdown(&self) {
        self.shutdown.shutdown().await;
    }
}

/// Drain-and-stop handle returned by [`LokiClient::new`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    inner: Arc<ShutdownState>,
}

#[derive(Debug)]
struct ShutdownState {
    cancel_token: CancellationToken,
    grace: Duration,
    /// Flips to `true` once the aggregator task has exited.
    finished: watch::Receiver<bool>,
    done: OnceCell<()>,
}

impl ShutdownHandle {
    /// Closes the queue and waits for the aggregator to flush what it holds
    /// and exit.
    ///
    /// Producers must have stopped writing before this is called; entries
    /// written afterwards are dropped. Runs once: concurrent and repeated
    /// calls all return after the first sequence completes. Dropping the
    /// returned future does not stop the drain, and a later call still
    /// waits for it.
    pub async fn shutdown(&self) {
        self.inner
            .done
            .get_or_init(|| async {
                if !self.inner.grace.is_zero() {
                    tokio::time::sleep(self.inner.grace).await;
                }
                self.inner.cancel_token.cancel();

                let mut finished = self.inner.finished.clone();
                // The sender is only dropped after it has published `true`.
                let _ = finished.wait_for(|done| *done).await;
                debug!("LOKI | Client shut down");
            })
            .await;
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.done.initialized()
    }
}
