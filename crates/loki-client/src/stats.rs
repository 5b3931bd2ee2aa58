// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery counters shared by the producers, the aggregator and the flusher.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ClientStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
    send_attempts: AtomicU64,
    batches_sent: AtomicU64,
    entries_sent: AtomicU64,
    batches_failed: AtomicU64,
}

/// Point-in-time copy of [`ClientStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Entries accepted into the queue.
    pub accepted: u64,
    /// Records refused by the normalizer.
    pub rejected: u64,
    /// Entries dropped because the queue stayed full, or was closed.
    pub dropped: u64,
    /// HTTP attempts issued, retries included.
    pub send_attempts: u64,
    pub batches_sent: u64,
    pub entries_sent: u64,
    /// Batches discarded after exhausting their attempts.
    pub batches_failed: u64,
}

impl ClientStats {
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_attempt(&self) {
        self.send_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self, entries: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.entries_sent.fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            send_attempts: self.send_attempts.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            entries_sent: self.entries_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}
