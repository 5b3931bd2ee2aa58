// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Default values for [`ClientConfig`](crate::config::ClientConfig).
//!
//! Every option that is not set on the builder falls back to one of these.

use std::time::Duration;

/// Path of the push API, appended to `{scheme}://{host}:{port}`.
pub const PUSH_PATH: &str = "/loki/api/v1/push";

/// Number of entries that triggers an immediate flush.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Capacity of the bounded ingestion queue.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Interval of the periodic flush.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(15);

/// How long a producer waits for queue space before the entry is dropped.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Bound on a single HTTP attempt.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts per batch, including the first one.
pub const DEFAULT_SEND_ATTEMPTS: u32 = 3;

/// Backoff step: the wait after failed attempt `i` is `i * step` plus jitter.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Upper bound (exclusive) of the random jitter added to each backoff.
pub const DEFAULT_BACKOFF_JITTER: Duration = Duration::from_millis(400);

/// Record field holding the timestamp.
pub const TIME_FIELD: &str = "time";

/// Record field holding the log line.
pub const MESSAGE_FIELD: &str = "msg";

/// Record field that is never forwarded as metadata.
pub const SERVICE_FIELD: &str = "service";

/// Value of the `User-Agent` header unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("loki-client/", env!("CARGO_PKG_VERSION"));
