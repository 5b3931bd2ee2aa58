// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Background worker that turns queued entries into batches.
//!
//! # States
//!
//! ```text
//!   Running ── entry ──> append, flush when the batch is full
//!      │    ── tick  ──> flush whatever is accumulated
//!      │
//!      └── shutdown signal / every producer gone
//!                │
//!                v
//!   Draining ── close the queue, consume what is buffered,
//!               flush the final partial batch, exit
//! ```
//!
//! Flushes are awaited inline, so batches leave in the order their entries
//! arrived and never overlap.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entry::LogEntry;
use crate::flusher::BatchSink;

/// First tick used when `start + period` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

pub struct BatchAggregator<S> {
    rx: mpsc::Receiver<LogEntry>,
    sink: S,
    batch_size: usize,
    period: Duration,
    cancel_token: CancellationToken,
    batch: Vec<LogEntry>,
}

impl<S: BatchSink> BatchAggregator<S> {
    #[must_use]
    pub fn new(
        rx: mpsc::Receiver<LogEntry>,
        sink: S,
        batch_size: usize,
        period: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            rx,
            sink,
            batch_size: batch_size.max(1),
            period,
            cancel_token,
            batch: Vec::with_capacity(batch_size),
        }
    }

    /// Runs until shutdown is signalled or every producer handle is dropped,
    /// then drains the queue and returns.
    pub async fn run(mut self) {
        debug!("LOKI | Batch aggregator started");

        // The first tick comes one full period after start.
        let start = Instant::now();
        let first_tick = start
            .checked_add(self.period)
            .unwrap_or_else(|| start + FAR_FUTURE);
        let mut ticker = interval_at(first_tick, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                entry = self.rx.recv() => match entry {
                    Some(entry) => self.push(entry).await,
                    None => {
                        debug!("LOKI | All producers dropped, draining");
                        break;
                    }
                },
                _ = ticker.tick() => self.flush().await,
                () = self.cancel_token.cancelled() => {
                    debug!("LOKI | Received shutdown signal, draining");
                    break;
                }
            }
        }

        self.drain().await;
        debug!("LOKI | Batch aggregator stopped");
    }

    async fn push(&mut self, entry: LogEntry) {
        self.batch.push(entry);
        if self.batch.len() >= self.batch_size {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        self.sink.flush(&batch).await;
    }

    async fn drain(&mut self) {
        self.rx.close();
        while let Some(entry) = self.rx.recv().await {
            self.push(entry).await;
        }
        self.flush().await;
    }
}
