// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded ingestion queue between producers and the batch aggregator.
//!
//! Producers never wait longer than the write timeout: an entry that cannot
//! be queued within that window is dropped and reported, and the producer
//! carries on. The receiving half belongs to the aggregator, which closes it
//! when shutdown starts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tracing::warn;

use crate::entry::LogEntry;
use crate::stats::ClientStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Dropped,
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct IngestionQueue {
    tx: mpsc::Sender<LogEntry>,
    write_timeout: Duration,
    stats: Arc<ClientStats>,
}

impl IngestionQueue {
    /// Creates a queue holding at most `capacity` entries and returns the
    /// receiving half alongside it.
    #[must_use]
    pub fn new(
        capacity: usize,
        write_timeout: Duration,
        stats: Arc<ClientStats>,
    ) -> (Self, mpsc::Receiver<LogEntry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            tx,
            write_timeout,
            stats,
        };
        (queue, rx)
    }

    pub async fn enqueue(&self, entry: LogEntry) -> EnqueueOutcome {
        let entry = match self.tx.try_send(entry) {
            Ok(()) => return self.accept(),
            Err(TrySendError::Closed(_)) => return self.drop_entry("queue is closed"),
            Err(TrySendError::Full(entry)) => entry,
        };

        match self.tx.send_timeout(entry, self.write_timeout).await {
            Ok(()) => self.accept(),
            Err(SendTimeoutError::Timeout(_)) => self.drop_entry("buffer is full"),
            Err(SendTimeoutError::Closed(_)) => self.drop_entry("queue is closed"),
        }
    }

    /// Number of entries waiting for the aggregator.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn accept(&self) -> EnqueueOutcome {
        self.stats.record_accepted();
        EnqueueOutcome::Accepted
    }

    fn drop_entry(&self, reason: &str) -> EnqueueOutcome {
        self.stats.record_dropped();
        warn!("LOKI | {reason}, dropping log entry");
        EnqueueOutcome::Dropped
    }
}
